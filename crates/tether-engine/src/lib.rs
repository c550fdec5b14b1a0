// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Domain adapters.
//
// Each adapter allocates through its domain's service singleton, wraps the
// handle in a `HandleOwner` straight away and routes every call through the
// same service. Raw handles never leave this crate. `dispose` consumes the
// adapter; one that is dropped instead is reclaimed by the registry daemon.

pub mod context;
pub mod digest;
pub mod kdf;
pub mod kem;
pub mod keys;
pub mod ops;
pub mod signature;

pub use context::Context;
pub use digest::{Digest, digest_in};
pub use kem::{Encapsulated, decapsulate, encapsulate};
pub use keys::KeySpec;
pub use ops::{FaultGuard, FaultInjection};
pub use signature::{Signer, Verifier};


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, LazyLock};
    use std::thread;
    use std::time::{Duration, Instant};

    use tether_bridge::{NativeTable, Services};
    use tether_core::{BackendKind, ErrorClass, KeyType, TetherConfig};
    use tether_disposal::{Registry, scoped};
    use tether_native::{Handle, NativeFns};

    use super::*;
    use crate::test_support::{context, init_tracing};

    // A dispatch table whose digest dispose counts its calls.
    static DIGEST_RELEASES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_md_dispose(handle: Handle) {
        DIGEST_RELEASES.fetch_add(1, Ordering::SeqCst);
        unsafe { (tether_native::dispatch::TABLE.md_dispose)(handle) }
    }

    struct CountingBackend {
        fns: NativeFns,
    }

    impl NativeTable for CountingBackend {
        fn fns(&self) -> &NativeFns {
            &self.fns
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Dispatch
        }
    }

    static COUNTING: LazyLock<CountingBackend> = LazyLock::new(|| CountingBackend {
        fns: NativeFns {
            md_dispose: counting_md_dispose,
            ..tether_native::dispatch::TABLE
        },
    });

    fn counting_context(registry: Arc<Registry>) -> Context {
        Context::new(Services::from_backend(LazyLock::force(&COUNTING)), registry)
    }

    #[test]
    fn unresolvable_digest_name_registers_no_owner() {
        let ctx = context();
        let err = Digest::new_in(&ctx, "SHA-3-1024").unwrap_err();
        assert_eq!(err.class(), ErrorClass::InputValidation);
        assert!(err.to_string().contains("SHA-3-1024"), "{err}");
        let stats = ctx.registry().stats();
        assert_eq!((stats.registered, stats.live), (0, 0));
    }

    #[test]
    fn unreachable_owners_reclaimed_once_each() {
        init_tracing();
        let config = TetherConfig {
            sweep_interval_ms: 10,
            ..TetherConfig::default()
        };
        let ctx = counting_context(Registry::new(&config).unwrap());
        let before = DIGEST_RELEASES.load(Ordering::SeqCst);

        let explicit = Digest::new_in(&ctx, "SHA-256").unwrap();
        let dropped = Digest::new_in(&ctx, "SHA-256").unwrap();
        let scoped_out = scoped(Digest::new_in(&ctx, "SHA-1").unwrap(), |d| {
            d.update(b"abc").unwrap();
            d.finalize().unwrap()
        });
        assert_eq!(scoped_out.len(), 20);
        explicit.dispose();
        drop(dropped);

        // Bounded wait for the daemon, without relying on `flush`.
        let deadline = Instant::now() + Duration::from_secs(5);
        while ctx.registry().live_count() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        ctx.registry().flush();

        assert_eq!(ctx.registry().live_count(), 0);
        assert_eq!(DIGEST_RELEASES.load(Ordering::SeqCst) - before, 3);
        let stats = ctx.registry().stats();
        assert_eq!(stats.explicit, 2);
        assert_eq!(stats.reclaimed + stats.swept, 1);
    }

    #[test]
    fn concurrent_owners_release_exactly_once() {
        let ctx = context();
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let ctx = ctx.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        let mut key = KeySpec::generate_in(&ctx, KeyType::X25519).unwrap();
                        let sealed = encapsulate(&mut key).unwrap();
                        assert_eq!(decapsulate(&mut key, &sealed.ciphertext).unwrap(), sealed.secret);
                        if (i + j) % 2 == 0 {
                            key.dispose();
                        }
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        ctx.registry().flush();
        ctx.registry().sweep_now();

        let stats = ctx.registry().stats();
        assert_eq!(stats.registered, 400);
        assert_eq!(stats.explicit + stats.reclaimed + stats.swept, 400);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.live, 0);
    }

    #[test]
    fn global_context_uses_selected_backend() {
        let ctx = Context::global().unwrap();
        assert_eq!(ctx.services().kind(), tether_bridge::selection().backend);
        let out = digest_in(&ctx, "SHA-256", b"").unwrap();
        assert_eq!(
            hex::encode(out),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
