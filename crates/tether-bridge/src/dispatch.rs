// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Precompiled dispatch backend.
//
// Always available: the native entry points are linked in and bound through
// the library's static table.

use tether_core::BackendKind;
use tether_native::NativeFns;

use crate::traits::NativeTable;

/// Backend over `tether_native::dispatch::TABLE`.
#[derive(Debug)]
pub struct DispatchBackend;

pub static DISPATCH: DispatchBackend = DispatchBackend;

impl NativeTable for DispatchBackend {
    fn fns(&self) -> &NativeFns {
        &tether_native::dispatch::TABLE
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Dispatch
    }
}
