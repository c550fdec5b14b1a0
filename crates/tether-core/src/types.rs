// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared domain types.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Native handles
// ---------------------------------------------------------------------------

/// Opaque address-sized value identifying state held by the native library.
///
/// Deliberately neither `Copy` nor `Clone`: exactly one value exists per
/// allocation, and whoever holds it is responsible for its release.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    /// Wrap a raw value returned by a native allocation. Zero means "no
    /// handle" and yields `None`.
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(NativeHandle)
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// The invocation strategy in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Entry points resolved by symbol name at runtime.
    Dynamic,
    /// Entry points taken from the precompiled dispatch table.
    Dispatch,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Dynamic => "dynamic",
            BackendKind::Dispatch => "dispatch",
        })
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Key algorithms understood by the key-spec domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum KeyType {
    Ed25519 = 1,
    X25519 = 2,
}

impl KeyType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(KeyType::Ed25519),
            2 => Some(KeyType::X25519),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyType::Ed25519 => "Ed25519",
            KeyType::X25519 => "X25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Native fault-injection flags. Each one forces a specific, otherwise
/// hard to reach, failure branch inside the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum OpsFlag {
    /// Digest output length reported as exceeding 32-bit range.
    Int32Overflow1 = 0,
    /// Encoded key length reported as exceeding 32-bit range.
    Int32Overflow2 = 1,
    /// Signature / encapsulation length reported as exceeding 32-bit range.
    Int32Overflow3 = 2,
    /// Input buffer cannot be accessed.
    FailedAccess1 = 3,
    /// Output buffer cannot be accessed.
    FailedAccess2 = 4,
    /// Name string cannot be accessed.
    FailedAccess3 = 5,
    /// Signature buffer cannot be accessed.
    FailedAccess4 = 6,
    /// Key material pointer changes during decode.
    PointerChange = 7,
    /// Digest update fails inside the library.
    NativeError1 = 8,
    /// Digest finalize fails inside the library.
    NativeError2 = 9,
    /// Sign / verify fails inside the library.
    NativeError3 = 10,
    /// Key derivation fails inside the library.
    NativeError4 = 11,
    /// Signature length changes between query and sign.
    LenChange1 = 12,
    /// Digest context creation fails.
    FailedCreate1 = 13,
    /// Key spec / signature context creation fails.
    FailedCreate2 = 14,
    /// Digest initialisation fails.
    FailedInit1 = 15,
    /// Setting the XOF length parameter fails.
    FailedSet1 = 16,
}

impl OpsFlag {
    pub const ALL: [OpsFlag; 17] = [
        OpsFlag::Int32Overflow1,
        OpsFlag::Int32Overflow2,
        OpsFlag::Int32Overflow3,
        OpsFlag::FailedAccess1,
        OpsFlag::FailedAccess2,
        OpsFlag::FailedAccess3,
        OpsFlag::FailedAccess4,
        OpsFlag::PointerChange,
        OpsFlag::NativeError1,
        OpsFlag::NativeError2,
        OpsFlag::NativeError3,
        OpsFlag::NativeError4,
        OpsFlag::LenChange1,
        OpsFlag::FailedCreate1,
        OpsFlag::FailedCreate2,
        OpsFlag::FailedInit1,
        OpsFlag::FailedSet1,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_handle() {
        assert!(NativeHandle::from_raw(0).is_none());
        let h = NativeHandle::from_raw(0xdead_beef).unwrap();
        assert_eq!(h.as_raw(), 0xdead_beef);
        assert_eq!(h.to_string(), "0xdeadbeef");
    }

    #[test]
    fn key_type_raw_values() {
        for kt in [KeyType::Ed25519, KeyType::X25519] {
            assert_eq!(KeyType::from_raw(kt.as_raw()), Some(kt));
        }
        assert_eq!(KeyType::from_raw(0), None);
    }

    #[test]
    fn ops_flag_indices_are_dense() {
        for (i, flag) in OpsFlag::ALL.iter().enumerate() {
            assert_eq!(flag.index(), i as i32);
        }
    }
}
