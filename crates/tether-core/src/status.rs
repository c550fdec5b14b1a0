// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native status code translation.
//
// Every native call returns a signed 32-bit status. Non-negative values are
// success or a payload (a length, a boolean). Negative values come from a
// closed table agreed with the native library and each one resolves to
// exactly one `FailureKind`. A negative value outside that table means the
// two sides disagree about the contract and translation panics.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, TetherError};

/// Raw value returned by every native entry point.
pub type StatusCode = i32;

/// Closed set of abstract failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    NameNotFound,
    AllocationFailed,
    InvalidArgument,
    OutOfRange,
    StateCorruption,
    UnexpectedPointerChange,
    SizeOverflow,
    WrappedNativeError,
    AccessDenied,
}

impl FailureKind {
    pub const ALL: [FailureKind; 9] = [
        FailureKind::NameNotFound,
        FailureKind::AllocationFailed,
        FailureKind::InvalidArgument,
        FailureKind::OutOfRange,
        FailureKind::StateCorruption,
        FailureKind::UnexpectedPointerChange,
        FailureKind::SizeOverflow,
        FailureKind::WrappedNativeError,
        FailureKind::AccessDenied,
    ];
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NameNotFound => "name not found",
            FailureKind::AllocationFailed => "allocation failed",
            FailureKind::InvalidArgument => "invalid argument",
            FailureKind::OutOfRange => "out of range",
            FailureKind::StateCorruption => "state corruption",
            FailureKind::UnexpectedPointerChange => "unexpected pointer change",
            FailureKind::SizeOverflow => "size overflow",
            FailureKind::WrappedNativeError => "native error",
            FailureKind::AccessDenied => "access denied",
        };
        f.write_str(s)
    }
}

/// Negative status codes defined by the native contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    // -- General --
    Fail = -1,
    NativeError = -2,
    NameIsNull = -3,
    NameNotFound = -4,
    NameAccessFailed = -5,
    CreateFailed = -6,
    InitFailed = -7,
    SetParamFailed = -8,
    NotInitialized = -9,
    UnexpectedState = -10,
    UnexpectedPointerChange = -11,
    InvalidHandle = -12,

    // -- Buffers --
    InputIsNull = -16,
    OutputIsNull = -17,
    OutputTooSmall = -18,
    InputTooLongInt32 = -19,
    OutputTooLongInt32 = -20,
    FailedAccessInput = -22,
    FailedAccessOutput = -23,
    InputLenNegative = -24,
    InputOffsetNegative = -25,
    OutputLenNegative = -26,
    OutputOffsetNegative = -27,
    InputOutOfRange = -28,
    OutputOutOfRange = -29,
    XofLenInvalid = -30,
    OutputSizeIntOverflow = -34,

    // -- Keys --
    KeySpecHasNullKey = -40,
    IncorrectKeyType = -41,
    UnknownKeyType = -42,
    EncodedPublicKeyLen = -43,
    EncodedPrivateKeyLen = -44,

    // -- Signatures / encapsulation --
    SigIsNull = -48,
    SigOutOfRange = -49,
    FailedAccessSig = -50,
    UnexpectedSigLenChange = -51,
    InvalidCiphertextLen = -52,

    // -- Key derivation --
    KdfSaltEmpty = -60,
    KdfIterNotPositive = -61,
    KdfUnknownDigest = -62,
    KdfOutputTooLong = -63,
    ScryptNTooSmall = -64,
    ScryptNNotPow2 = -65,
    ScryptRNotPositive = -66,
    ScryptPNotPositive = -67,
}

impl ErrorCode {
    /// Every code in the contract, in declaration order.
    pub const ALL: [ErrorCode; 45] = [
        ErrorCode::Fail,
        ErrorCode::NativeError,
        ErrorCode::NameIsNull,
        ErrorCode::NameNotFound,
        ErrorCode::NameAccessFailed,
        ErrorCode::CreateFailed,
        ErrorCode::InitFailed,
        ErrorCode::SetParamFailed,
        ErrorCode::NotInitialized,
        ErrorCode::UnexpectedState,
        ErrorCode::UnexpectedPointerChange,
        ErrorCode::InvalidHandle,
        ErrorCode::InputIsNull,
        ErrorCode::OutputIsNull,
        ErrorCode::OutputTooSmall,
        ErrorCode::InputTooLongInt32,
        ErrorCode::OutputTooLongInt32,
        ErrorCode::FailedAccessInput,
        ErrorCode::FailedAccessOutput,
        ErrorCode::InputLenNegative,
        ErrorCode::InputOffsetNegative,
        ErrorCode::OutputLenNegative,
        ErrorCode::OutputOffsetNegative,
        ErrorCode::InputOutOfRange,
        ErrorCode::OutputOutOfRange,
        ErrorCode::XofLenInvalid,
        ErrorCode::OutputSizeIntOverflow,
        ErrorCode::KeySpecHasNullKey,
        ErrorCode::IncorrectKeyType,
        ErrorCode::UnknownKeyType,
        ErrorCode::EncodedPublicKeyLen,
        ErrorCode::EncodedPrivateKeyLen,
        ErrorCode::SigIsNull,
        ErrorCode::SigOutOfRange,
        ErrorCode::FailedAccessSig,
        ErrorCode::UnexpectedSigLenChange,
        ErrorCode::InvalidCiphertextLen,
        ErrorCode::KdfSaltEmpty,
        ErrorCode::KdfIterNotPositive,
        ErrorCode::KdfUnknownDigest,
        ErrorCode::KdfOutputTooLong,
        ErrorCode::ScryptNTooSmall,
        ErrorCode::ScryptNNotPow2,
        ErrorCode::ScryptRNotPositive,
        ErrorCode::ScryptPNotPositive,
    ];

    /// Look up a raw status. `None` for non-negative values and for negative
    /// values the contract does not define.
    pub fn from_code(code: StatusCode) -> Option<Self> {
        if code >= 0 {
            return None;
        }
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn code(self) -> StatusCode {
        self as StatusCode
    }

    /// The failure kind for this code. Adding a code without extending this
    /// match is a compile error.
    pub fn failure_kind(self) -> FailureKind {
        use ErrorCode::*;
        match self {
            NameNotFound | KdfUnknownDigest => FailureKind::NameNotFound,

            CreateFailed | InitFailed => FailureKind::AllocationFailed,

            NameIsNull | InputIsNull | OutputIsNull | InputLenNegative
            | InputOffsetNegative | OutputLenNegative | OutputOffsetNegative
            | XofLenInvalid | KeySpecHasNullKey | IncorrectKeyType | UnknownKeyType
            | EncodedPublicKeyLen | EncodedPrivateKeyLen | SigIsNull
            | InvalidCiphertextLen | KdfSaltEmpty | KdfIterNotPositive | ScryptNTooSmall
            | ScryptNNotPow2 | ScryptRNotPositive | ScryptPNotPositive => {
                FailureKind::InvalidArgument
            }

            OutputTooSmall | InputOutOfRange | OutputOutOfRange | SigOutOfRange
            | KdfOutputTooLong => FailureKind::OutOfRange,

            Fail | NotInitialized | UnexpectedState | InvalidHandle
            | UnexpectedSigLenChange => FailureKind::StateCorruption,

            UnexpectedPointerChange => FailureKind::UnexpectedPointerChange,

            InputTooLongInt32 | OutputTooLongInt32 | OutputSizeIntOverflow => {
                FailureKind::SizeOverflow
            }

            NativeError | SetParamFailed => FailureKind::WrappedNativeError,

            NameAccessFailed | FailedAccessInput | FailedAccessOutput | FailedAccessSig => {
                FailureKind::AccessDenied
            }
        }
    }

    /// Canonical message for this code.
    pub fn message(self) -> &'static str {
        use ErrorCode::*;
        match self {
            Fail => "native call failed",
            NativeError => "native library error",
            NameIsNull => "name is null",
            NameNotFound => "name not found",
            NameAccessFailed => "unable to access name",
            CreateFailed => "unable to create native context",
            InitFailed => "unable to initialise native context",
            SetParamFailed => "unable to set native parameter",
            NotInitialized => "context not initialised for this operation",
            UnexpectedState => "unexpected native state",
            UnexpectedPointerChange => "native pointer changed unexpectedly",
            InvalidHandle => "invalid native handle",
            InputIsNull => "input is null",
            OutputIsNull => "output is null",
            OutputTooSmall => "output too small",
            InputTooLongInt32 => "input length exceeds 32-bit range",
            OutputTooLongInt32 => "output length exceeds 32-bit range",
            FailedAccessInput => "unable to access input",
            FailedAccessOutput => "unable to access output",
            InputLenNegative => "input length is negative",
            InputOffsetNegative => "input offset is negative",
            OutputLenNegative => "output length is negative",
            OutputOffsetNegative => "output offset is negative",
            InputOutOfRange => "input offset + length is out of range",
            OutputOutOfRange => "output offset + length is out of range",
            XofLenInvalid => "invalid XOF length",
            OutputSizeIntOverflow => "output size overflows 32-bit range",
            KeySpecHasNullKey => "key spec has no key",
            IncorrectKeyType => "incorrect key type",
            UnknownKeyType => "unknown key type",
            EncodedPublicKeyLen => "encoded public key has wrong length",
            EncodedPrivateKeyLen => "encoded private key has wrong length",
            SigIsNull => "signature is null",
            SigOutOfRange => "signature offset + length is out of range",
            FailedAccessSig => "unable to access signature",
            UnexpectedSigLenChange => "signature length changed unexpectedly",
            InvalidCiphertextLen => "ciphertext has wrong length",
            KdfSaltEmpty => "salt is empty",
            KdfIterNotPositive => "iteration count must be positive",
            KdfUnknownDigest => "unknown KDF digest",
            KdfOutputTooLong => "requested KDF output too long",
            ScryptNTooSmall => "scrypt cost N must be at least 2",
            ScryptNNotPow2 => "scrypt cost N must be a power of two",
            ScryptRNotPositive => "scrypt block size r must be positive",
            ScryptPNotPositive => "scrypt parallelism p must be positive",
        }
    }
}

/// Translate a raw status into a caller-visible result.
///
/// Non-negative codes pass through as `usize`. Negative codes become
/// `TetherError::Native`; wrapped native errors carry the text produced by
/// `diagnostics` (typically the drained native error queue), which is only
/// evaluated on that path.
///
/// # Panics
///
/// Panics if `code` is negative and not part of the native contract.
pub fn translate(code: StatusCode, diagnostics: impl FnOnce() -> String) -> Result<usize> {
    if code >= 0 {
        return Ok(code as usize);
    }

    let Some(error) = ErrorCode::from_code(code) else {
        panic!("unmapped native status code {code}: native contract mismatch");
    };

    let kind = error.failure_kind();
    let detail = if kind == FailureKind::WrappedNativeError {
        let native = diagnostics();
        if native.is_empty() {
            error.message().to_string()
        } else {
            format!("{}: {native}", error.message())
        }
    } else {
        error.message().to_string()
    };

    Err(TetherError::Native {
        kind,
        code: error,
        detail,
    })
}
