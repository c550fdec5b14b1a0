// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scoped use: dispose on every exit path, including unwinding.

use std::mem::ManuallyDrop;

/// Values that release native state when disposed.
pub trait Dispose {
    fn dispose(self);
}

struct DisposeOnExit<T: Dispose>(ManuallyDrop<T>);

impl<T: Dispose> Drop for DisposeOnExit<T> {
    fn drop(&mut self) {
        // SAFETY: the value is taken exactly once, here, and never touched
        // again.
        let value = unsafe { ManuallyDrop::take(&mut self.0) };
        value.dispose();
    }
}

/// Run `f` with `value`, then dispose it whether `f` returns or panics.
pub fn scoped<T: Dispose, R>(value: T, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = DisposeOnExit(ManuallyDrop::new(value));
    f(&mut guard.0)
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tether_core::{NativeHandle, TetherConfig};

    use super::*;
    use crate::{HandleOwner, Registry};

    struct Probe(Arc<AtomicUsize>);

    impl Dispose for Probe {
        fn dispose(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn disposes_after_normal_return() {
        let count = Arc::new(AtomicUsize::new(0));
        let out = scoped(Probe(Arc::clone(&count)), |p| {
            assert_eq!(p.0.load(Ordering::SeqCst), 0);
            7
        });
        assert_eq!(out, 7);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposes_when_body_panics() {
        let count = Arc::new(AtomicUsize::new(0));
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            scoped(Probe(Arc::clone(&count)), |_| panic!("body failed"))
        }));
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scoped_owner_released_explicitly() {
        let config = TetherConfig {
            sweep_interval_ms: 20,
            ..TetherConfig::default()
        };
        let registry = Registry::new(&config).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let owner = HandleOwner::register_in(
            &registry,
            NativeHandle::from_raw(0x9000).unwrap(),
            "KeySpec",
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        let raw = scoped(owner, |o| o.raw());
        assert_eq!(raw, 0x9000);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.stats().explicit, 1);
    }
}
