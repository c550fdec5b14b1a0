// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error classification.
//
// Every error falls in one of three classes that tell the caller what to do
// about it: fix the input, give up on the resource, or treat the process as
// compromised.

use serde::Serialize;

use crate::error::TetherError;
use crate::status::FailureKind;

/// Coarse error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// A broken invariant between this crate and the native library. Not
    /// recoverable by retrying.
    ContractViolation,
    /// The native side could not provide or access a resource.
    ResourceFailure,
    /// The caller passed something the native side rejected.
    InputValidation,
}

impl FailureKind {
    pub fn class(self) -> ErrorClass {
        match self {
            FailureKind::NameNotFound
            | FailureKind::InvalidArgument
            | FailureKind::OutOfRange
            | FailureKind::SizeOverflow => ErrorClass::InputValidation,
            FailureKind::AllocationFailed
            | FailureKind::WrappedNativeError
            | FailureKind::AccessDenied => ErrorClass::ResourceFailure,
            FailureKind::StateCorruption | FailureKind::UnexpectedPointerChange => {
                ErrorClass::ContractViolation
            }
        }
    }
}

/// An error's class with a short operator-facing summary.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub class: ErrorClass,
    /// One-line description suitable for logs and diagnostics dumps.
    pub summary: String,
    /// Whether repeating the same call could plausibly succeed.
    pub retriable: bool,
}

/// Classify an error.
pub fn classify(err: &TetherError) -> Classification {
    match err {
        TetherError::Native { kind, detail, .. } => Classification {
            class: kind.class(),
            summary: format!("{kind}: {detail}"),
            retriable: matches!(
                kind,
                FailureKind::AllocationFailed | FailureKind::WrappedNativeError
            ),
        },

        TetherError::InvalidArgument(detail) => Classification {
            class: ErrorClass::InputValidation,
            summary: format!("rejected before the native call: {detail}"),
            retriable: false,
        },

        TetherError::ContractViolation(detail) => Classification {
            class: ErrorClass::ContractViolation,
            summary: format!("native contract broken: {detail}"),
            retriable: false,
        },

        TetherError::BackendUnavailable(detail) => Classification {
            class: ErrorClass::ResourceFailure,
            summary: format!("no usable native backend: {detail}"),
            retriable: false,
        },

        TetherError::Config(detail) => Classification {
            class: ErrorClass::InputValidation,
            summary: format!("bad configuration: {detail}"),
            retriable: false,
        },

        TetherError::Io(io_err) => Classification {
            class: ErrorClass::ResourceFailure,
            summary: format!("I/O failure: {io_err}"),
            retriable: io_err.kind() == std::io::ErrorKind::Interrupted,
        },

        TetherError::Serialization(e) => Classification {
            class: ErrorClass::InputValidation,
            summary: format!("malformed data: {e}"),
            retriable: false,
        },
    }
}

impl TetherError {
    pub fn class(&self) -> ErrorClass {
        classify(self).class
    }
}
