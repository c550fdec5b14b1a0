// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fault injection for exercising rare native failure paths.
//
// Flags live in the native library's thread-local state, so a guard only
// affects calls made on the thread that created it and is not `Send`.

use std::marker::PhantomData;

use tether_bridge::OpsTestService;
use tether_core::{OpsFlag, Result, TetherError};
use tracing::{debug, warn};

use crate::context::Context;

/// Access to the native fault-injection flags.
#[derive(Clone, Copy)]
pub struct FaultInjection {
    service: &'static dyn OpsTestService,
}

impl FaultInjection {
    /// Fails with `BackendUnavailable` unless the native library was built
    /// with fault injection.
    pub fn new(ctx: &Context) -> Result<Self> {
        let service = ctx.services().ops_test;
        if !service.available() {
            return Err(TetherError::BackendUnavailable(
                "native library built without fault injection".into(),
            ));
        }
        Ok(Self { service })
    }

    pub fn set(&self, flag: OpsFlag, on: bool) -> Result<()> {
        self.service.set(flag, on)
    }

    /// Clear every flag on this thread.
    pub fn reset(&self) {
        self.service.reset();
    }

    /// Raise `flag` until the returned guard is dropped.
    pub fn inject(&self, flag: OpsFlag) -> Result<FaultGuard<'_>> {
        self.set(flag, true)?;
        debug!(?flag, "fault injected");
        Ok(FaultGuard {
            faults: self,
            flag,
            _thread_bound: PhantomData,
        })
    }
}

/// Clears its flag when dropped.
pub struct FaultGuard<'a> {
    faults: &'a FaultInjection,
    flag: OpsFlag,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for FaultGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.faults.set(self.flag, false) {
            warn!(flag = ?self.flag, error = %e, "failed to clear injected fault");
        }
    }
}

#[cfg(test)]
mod tests {
    use tether_core::FailureKind;

    use super::*;
    use crate::digest::Digest;
    use crate::test_support::context;

    #[test]
    fn every_flag_can_be_toggled() {
        let faults = FaultInjection::new(&context()).unwrap();
        for flag in OpsFlag::ALL {
            faults.set(flag, true).unwrap();
            faults.set(flag, false).unwrap();
        }
        faults.reset();
    }

    #[test]
    fn guard_scope_bounds_the_fault() {
        let ctx = context();
        let faults = FaultInjection::new(&ctx).unwrap();
        {
            let _guard = faults.inject(OpsFlag::FailedCreate1).unwrap();
            let err = Digest::new_in(&ctx, "SHA-256").unwrap_err();
            assert_eq!(err.failure_kind(), Some(FailureKind::AllocationFailed));
        }
        Digest::new_in(&ctx, "SHA-256").unwrap().dispose();
    }

    #[test]
    fn flags_do_not_cross_threads() {
        let ctx = context();
        let faults = FaultInjection::new(&ctx).unwrap();
        let _guard = faults.inject(OpsFlag::FailedCreate1).unwrap();
        let other = ctx.clone();
        let allocated = std::thread::spawn(move || {
            Digest::new_in(&other, "SHA-256").map(Digest::dispose).is_ok()
        })
        .join()
        .unwrap();
        assert!(allocated);
    }
}
