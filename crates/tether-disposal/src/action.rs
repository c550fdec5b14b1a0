// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// At-most-once release of one native handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tether_core::NativeHandle;

type Release = Box<dyn Fn(&NativeHandle) + Send + Sync>;

/// Binds a handle to the domain function that frees it.
///
/// `run` may be called any number of times from any thread; the release
/// function executes on the first call only. If it panics the action still
/// counts as completed, so a failing release is never retried.
pub struct DisposeAction {
    handle: NativeHandle,
    release: Release,
    completed: AtomicBool,
}

impl DisposeAction {
    pub fn new(
        handle: NativeHandle,
        release: impl Fn(&NativeHandle) + Send + Sync + 'static,
    ) -> Self {
        Self {
            handle,
            release: Box::new(release),
            completed: AtomicBool::new(false),
        }
    }

    /// Release the handle if nobody has yet. Returns `true` for the caller
    /// that performed the release.
    pub fn run(&self) -> bool {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        (self.release)(&self.handle);
        true
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }
}

impl fmt::Debug for DisposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeAction")
            .field("handle", &format_args!("{}", self.handle))
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;

    fn counting(raw: usize) -> (DisposeAction, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let action = DisposeAction::new(NativeHandle::from_raw(raw).unwrap(), move |h| {
            assert_eq!(h.as_raw(), raw);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (action, calls)
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (action, calls) = counting(0x10);
        assert!(action.run());
        assert!(!action.run());
        assert!(action.is_completed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_callers_release_once() {
        for _ in 0..50 {
            let (action, calls) = counting(0x20);
            let action = Arc::new(action);
            let winners: usize = (0..8)
                .map(|_| {
                    let a = Arc::clone(&action);
                    thread::spawn(move || a.run())
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|t| usize::from(t.join().unwrap()))
                .sum();
            assert_eq!(winners, 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn panicking_release_is_not_retried() {
        let action = DisposeAction::new(NativeHandle::from_raw(1).unwrap(), |_| {
            panic!("release failed")
        });
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| action.run()));
        assert!(first.is_err());
        assert!(!action.run());
    }
}
