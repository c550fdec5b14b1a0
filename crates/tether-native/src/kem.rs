// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key encapsulation over X25519 key specs.
//
// Encapsulation generates an ephemeral X25519 key, agrees with the
// recipient's public key and runs the shared point through HKDF-SHA256
// bound to both public keys. The ciphertext is the ephemeral public key.

use ring::hkdf;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::abi::{Handle, INPUT, InBuf, OutBuf, guard};
use crate::codes::Code;
use crate::errors;
use crate::kdf::hkdf_fill;
use crate::ops::{self, Flag};
use crate::spec::{self, KEY_LEN, KeyKind, KeyMaterial};

pub const CIPHERTEXT_LEN: usize = KEY_LEN;
pub const SECRET_LEN: usize = 32;

const LABEL: &[u8] = b"tether x25519 kem";

unsafe fn recipient<'a>(handle: Handle) -> Result<&'a KeyMaterial, Code> {
    let key = unsafe { spec::material(handle) }?;
    if key.kind != KeyKind::X25519 {
        return Err(Code::IncorrectKeyType);
    }
    Ok(key)
}

fn derive(
    shared: &x25519_dalek::SharedSecret,
    ciphertext: &[u8],
    recipient: &[u8],
    out: &mut [u8],
) -> Result<(), Code> {
    if !shared.was_contributory() {
        errors::push("X25519 agreement produced a non-contributory secret");
        return Err(Code::NativeError);
    }
    hkdf_fill(
        hkdf::HKDF_SHA256,
        shared.as_bytes(),
        &[],
        &[LABEL, ciphertext, recipient],
        out,
    )
}

/// Write `ciphertext || secret` into `out`. A null `out` returns the
/// combined length.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle; `out` must be null or
/// describe writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kem_encapsulate(handle: Handle, out: OutBuf) -> i32 {
    guard(|| {
        let key = unsafe { recipient(handle) }?;
        if ops::is_set(Flag::Int32Overflow3) {
            return Err(Code::OutputSizeIntOverflow);
        }
        let total = CIPHERTEXT_LEN + SECRET_LEN;
        let Some(window) = (unsafe { out.sized(total) })? else {
            return Ok(total as i32);
        };

        let ephemeral = StaticSecret::from(*spec::random_bytes()?);
        let ciphertext = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&PublicKey::from(key.public));

        let (ct_out, secret_out) = window.split_at_mut(CIPHERTEXT_LEN);
        ct_out.copy_from_slice(ciphertext.as_bytes());
        derive(&shared, ciphertext.as_bytes(), &key.public, secret_out)?;
        Ok(total as i32)
    })
}

/// Recover the secret for `ciphertext` into `out`. A null `out` returns the
/// secret length.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle; the buffers must
/// describe valid memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kem_decapsulate(
    handle: Handle,
    ciphertext: InBuf,
    out: OutBuf,
) -> i32 {
    guard(|| {
        let key = unsafe { recipient(handle) }?;
        let private = key.private.as_ref().ok_or(Code::KeySpecHasNullKey)?;
        let ciphertext = unsafe { ciphertext.slice(&INPUT) }?;
        let ciphertext: [u8; CIPHERTEXT_LEN] = ciphertext
            .try_into()
            .map_err(|_| Code::InvalidCiphertextLen)?;
        let Some(window) = (unsafe { out.sized(SECRET_LEN) })? else {
            return Ok(SECRET_LEN as i32);
        };

        let secret = StaticSecret::from(**private);
        let shared = secret.diffie_hellman(&PublicKey::from(ciphertext));
        derive(&shared, &ciphertext, &key.public, window)?;
        Ok(SECRET_LEN as i32)
    })
}

/// Length of the shared secret produced for this key spec.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kem_secret_len(handle: Handle) -> i32 {
    guard(|| {
        let _ = unsafe { recipient(handle) }?;
        Ok(SECRET_LEN as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{tether_spec_allocate, tether_spec_dispose, tether_spec_generate};

    fn x25519_spec() -> Handle {
        let mut h: Handle = 0;
        unsafe {
            assert_eq!(tether_spec_allocate(&mut h), 0);
            assert_eq!(tether_spec_generate(h, KeyKind::X25519 as i32), 0);
        }
        h
    }

    #[test]
    fn encapsulate_then_decapsulate() {
        let h = x25519_spec();
        unsafe {
            let total = tether_kem_encapsulate(h, OutBuf::null());
            assert_eq!(total as usize, CIPHERTEXT_LEN + SECRET_LEN);

            let mut sealed = vec![0u8; total as usize];
            assert_eq!(tether_kem_encapsulate(h, OutBuf::new(&mut sealed, 0, total)), total);
            let (ct, secret) = sealed.split_at(CIPHERTEXT_LEN);

            let mut recovered = [0u8; SECRET_LEN];
            let n = tether_kem_decapsulate(h, InBuf::whole(ct), OutBuf::new(&mut recovered, 0, 32));
            assert_eq!(n, SECRET_LEN as i32);
            assert_eq!(&recovered[..], secret);
            tether_spec_dispose(h);
        }
    }

    #[test]
    fn wrong_key_type_and_ciphertext_length() {
        let mut ed: Handle = 0;
        let x = x25519_spec();
        unsafe {
            assert_eq!(tether_spec_allocate(&mut ed), 0);
            assert_eq!(tether_spec_generate(ed, KeyKind::Ed25519 as i32), 0);
            assert_eq!(tether_kem_encapsulate(ed, OutBuf::null()), Code::IncorrectKeyType.raw());

            let short = [0u8; 16];
            let mut out = [0u8; 32];
            assert_eq!(
                tether_kem_decapsulate(x, InBuf::whole(&short), OutBuf::new(&mut out, 0, 32)),
                Code::InvalidCiphertextLen.raw()
            );
            tether_spec_dispose(ed);
            tether_spec_dispose(x);
        }
    }
}
