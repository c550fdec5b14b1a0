// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether — core types, status code translation and error definitions shared
// across all crates.

pub mod classify;
pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use classify::{Classification, ErrorClass, classify};
pub use config::{BackendPreference, TetherConfig};
pub use error::{Result, TetherError};
pub use status::{ErrorCode, FailureKind, StatusCode, translate};
pub use types::*;
