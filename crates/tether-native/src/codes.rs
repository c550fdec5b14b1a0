// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status codes returned across the ABI. Values are part of the interface and
// must never be renumbered.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Code {
    Ok = 0,

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

    KeySpecHasNullKey = -40,
    IncorrectKeyType = -41,
    UnknownKeyType = -42,
    EncodedPublicKeyLen = -43,
    EncodedPrivateKeyLen = -44,

    SigIsNull = -48,
    SigOutOfRange = -49,
    FailedAccessSig = -50,
    UnexpectedSigLenChange = -51,
    InvalidCiphertextLen = -52,

    KdfSaltEmpty = -60,
    KdfIterNotPositive = -61,
    KdfUnknownDigest = -62,
    KdfOutputTooLong = -63,
    ScryptNTooSmall = -64,
    ScryptNNotPow2 = -65,
    ScryptRNotPositive = -66,
    ScryptPNotPositive = -67,
}

impl Code {
    /// Every failure code, in declaration order.
    pub const FAILURES: [Code; 45] = [
        Code::Fail,
        Code::NativeError,
        Code::NameIsNull,
        Code::NameNotFound,
        Code::NameAccessFailed,
        Code::CreateFailed,
        Code::InitFailed,
        Code::SetParamFailed,
        Code::NotInitialized,
        Code::UnexpectedState,
        Code::UnexpectedPointerChange,
        Code::InvalidHandle,
        Code::InputIsNull,
        Code::OutputIsNull,
        Code::OutputTooSmall,
        Code::InputTooLongInt32,
        Code::OutputTooLongInt32,
        Code::FailedAccessInput,
        Code::FailedAccessOutput,
        Code::InputLenNegative,
        Code::InputOffsetNegative,
        Code::OutputLenNegative,
        Code::OutputOffsetNegative,
        Code::InputOutOfRange,
        Code::OutputOutOfRange,
        Code::XofLenInvalid,
        Code::OutputSizeIntOverflow,
        Code::KeySpecHasNullKey,
        Code::IncorrectKeyType,
        Code::UnknownKeyType,
        Code::EncodedPublicKeyLen,
        Code::EncodedPrivateKeyLen,
        Code::SigIsNull,
        Code::SigOutOfRange,
        Code::FailedAccessSig,
        Code::UnexpectedSigLenChange,
        Code::InvalidCiphertextLen,
        Code::KdfSaltEmpty,
        Code::KdfIterNotPositive,
        Code::KdfUnknownDigest,
        Code::KdfOutputTooLong,
        Code::ScryptNTooSmall,
        Code::ScryptNNotPow2,
        Code::ScryptRNotPositive,
        Code::ScryptPNotPositive,
    ];

    pub fn raw(self) -> i32 {
        self as i32
    }
}
