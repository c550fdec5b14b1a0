// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether — native handle lifetime management.
//
// A `HandleOwner` is the only owner of one native handle. Release happens
// through its `DisposeAction` exactly once: explicitly via `dispose`, at the
// end of a `scoped` block, or, when the owner is dropped without either, on
// the reclamation daemon of the `Registry` it belongs to.

pub mod action;
pub mod owner;
pub mod registry;
pub mod scope;

pub use action::DisposeAction;
pub use owner::HandleOwner;
pub use registry::{Registry, RegistryStats, SlotKey};
pub use scope::{Dispose, scoped};
