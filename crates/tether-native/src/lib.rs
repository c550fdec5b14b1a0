// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether native library.
//
// Everything here is exposed through a C ABI: raw `usize` handles to boxed
// contexts, `#[repr(C)]` buffer triples, and `i32` status returns. Callers
// reach it either through the static `dispatch::TABLE` or by binding the
// exported symbols listed in `symbols::SYMBOLS` at runtime.
//
// No entry point unwinds across the ABI. A panic is caught, pushed onto the
// thread's error queue and reported as `Code::Fail`.

pub mod abi;
pub mod codes;
pub mod dispatch;
pub mod errors;
pub mod kdf;
pub mod kem;
pub mod md;
pub mod ops;
pub mod sig;
pub mod spec;
pub mod symbols;

pub use abi::{Handle, InBuf, NativeFns, OutBuf};
pub use codes::Code;
pub use symbols::INTERFACE_VERSION;
