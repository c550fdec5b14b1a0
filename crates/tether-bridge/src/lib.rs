// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native backend abstractions.
//
// Two strategies reach the native library: the precompiled dispatch table
// and symbols resolved by name at runtime. Both sit behind the same
// per-domain service traits, and `services()` hands out the process-wide
// choice.

pub mod dispatch;
pub mod dynamic;
pub mod selector;
pub mod traits;

pub use dispatch::{DISPATCH, DispatchBackend};
pub use dynamic::DynamicBackend;
pub use selector::{
    Selection, SelectionReport, Services, select_from, select_with, selection, services,
};
pub use traits::{
    DigestService, KdfService, KemService, KeyPart, KeySpecService, NativeErrors, NativeTable,
    OpsTestService, SignatureService,
};

#[cfg(test)]
mod tests {
    use tether_core::{ErrorCode, FailureKind, KeyType, OpsFlag};
    use tether_native::Code;
    use tether_native::ops::FLAG_COUNT;

    use super::*;

    fn both() -> [Services; 2] {
        [
            Services::dispatch(),
            Services::from_backend(DynamicBackend::shared().unwrap()),
        ]
    }

    fn hash(services: &Services, name: &str, data: &[u8]) -> String {
        let digest = services.digest;
        let handle = digest.allocate(name, 0).unwrap();
        let raw = handle.as_raw();
        unsafe {
            digest.update(raw, data, 0, data.len()).unwrap();
            let mut out = vec![0u8; digest.output_len(raw).unwrap()];
            let n = digest.finalize(raw, &mut out).unwrap();
            assert_eq!(n, out.len());
            digest.dispose(raw);
            hex::encode(out)
        }
    }

    #[test]
    fn native_codes_match_core_codes() {
        assert_eq!(Code::FAILURES.len(), ErrorCode::ALL.len());
        for code in Code::FAILURES {
            let core = ErrorCode::from_code(code.raw())
                .unwrap_or_else(|| panic!("{code:?} has no core counterpart"));
            assert_eq!(format!("{code:?}"), format!("{core:?}"));
        }
    }

    #[test]
    fn ops_flags_line_up() {
        assert_eq!(FLAG_COUNT, OpsFlag::ALL.len());
        assert_eq!(OpsFlag::FailedSet1.index() as usize, FLAG_COUNT - 1);
    }

    #[test]
    fn digest_vectors_on_both_backends() {
        for services in both() {
            assert_eq!(
                hash(&services, "SHA-1", b"abc"),
                "a9993e364706816aba3e25717850c26c9cd0d89d"
            );
            assert_eq!(
                hash(&services, "SHA-256", b"abc"),
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            );
            assert_eq!(
                hash(&services, "BLAKE3", b""),
                "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
            );
        }
    }

    #[test]
    fn kem_round_trip_on_both_backends() {
        for services in both() {
            let spec = services.key_spec.allocate().unwrap();
            let raw = spec.as_raw();
            unsafe {
                services.key_spec.generate(raw, KeyType::X25519).unwrap();
                let total = services.kem.encapsulated_len(raw).unwrap();
                let secret_len = services.kem.secret_len(raw).unwrap();
                let mut sealed = vec![0u8; total];
                services.kem.encapsulate(raw, &mut sealed).unwrap();
                let (ct, secret) = sealed.split_at(total - secret_len);

                let mut recovered = vec![0u8; secret_len];
                services.kem.decapsulate(raw, ct, &mut recovered).unwrap();
                assert_eq!(recovered, secret);
                services.key_spec.dispose(raw);
            }
        }
    }

    #[test]
    fn sign_verify_on_both_backends() {
        for services in both() {
            let spec = services.key_spec.allocate().unwrap().as_raw();
            let ctx = services.signature.allocate().unwrap().as_raw();
            unsafe {
                services.key_spec.generate(spec, KeyType::Ed25519).unwrap();
                services.signature.init_sign(ctx, spec).unwrap();
                services.signature.update(ctx, b"payload", 0, 7).unwrap();
                let mut sig = vec![0u8; services.signature.signature_len(ctx).unwrap()];
                services.signature.sign(ctx, &mut sig).unwrap();

                services.signature.init_verify(ctx, spec).unwrap();
                services.signature.update(ctx, b"payload", 0, 7).unwrap();
                assert!(services.signature.verify(ctx, &sig).unwrap());

                services.signature.update(ctx, b"tampered", 0, 8).unwrap();
                assert!(!services.signature.verify(ctx, &sig).unwrap());

                services.signature.dispose(ctx);
                services.key_spec.dispose(spec);
            }
        }
    }

    #[test]
    fn kdf_on_both_backends() {
        for services in both() {
            let mut out = [0u8; 20];
            let n = services
                .kdf
                .pbkdf2("SHA1", b"password", b"salt", 1, &mut out)
                .unwrap();
            assert_eq!(n, 20);
            assert_eq!(hex::encode(out), "0c60c80f961f0e71f3a9b524af6012062fe037a6");

            let err = services
                .kdf
                .pbkdf2("SHA1", b"password", b"", 1, &mut out)
                .unwrap_err();
            assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));
        }
    }

    #[test]
    fn fault_injection_through_services() {
        for services in both() {
            let ops = services.ops_test;
            assert!(ops.available());
            ops.set(OpsFlag::Int32Overflow1, true).unwrap();
            let handle = services.digest.allocate("SHA-256", 0).unwrap().as_raw();
            let err = unsafe { services.digest.output_len(handle) }.unwrap_err();
            assert_eq!(err.failure_kind(), Some(FailureKind::SizeOverflow));
            ops.reset();
            assert_eq!(unsafe { services.digest.output_len(handle) }.unwrap(), 32);
            unsafe { services.digest.dispose(handle) };
        }
    }
}
