// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tether.

use thiserror::Error;

use crate::status::{ErrorCode, FailureKind};

/// Top-level error type for all Tether operations.
#[derive(Debug, Error)]
pub enum TetherError {
    // -- Native status codes --
    /// A negative status code returned by the native library, already
    /// resolved to its failure kind.
    #[error("{kind}: {detail} (native code {})", code.code())]
    Native {
        kind: FailureKind,
        code: ErrorCode,
        detail: String,
    },

    // -- Local validation --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Broken invariants --
    #[error("contract violation: {0}")]
    ContractViolation(String),

    // -- Backend --
    #[error("native backend unavailable: {0}")]
    BackendUnavailable(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TetherError {
    /// Build a native error for `code` using its canonical message.
    pub fn from_code(code: ErrorCode) -> Self {
        TetherError::Native {
            kind: code.failure_kind(),
            code,
            detail: code.message().to_string(),
        }
    }

    /// The failure kind, when this error originated from a status code.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TetherError::Native { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Prefix the error detail with the operation it came from, e.g. the
    /// algorithm name that failed to resolve.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            TetherError::Native { kind, code, detail } => TetherError::Native {
                kind,
                code,
                detail: format!("{context}: {detail}"),
            },
            TetherError::InvalidArgument(d) => {
                TetherError::InvalidArgument(format!("{context}: {d}"))
            }
            TetherError::ContractViolation(d) => {
                TetherError::ContractViolation(format!("{context}: {d}"))
            }
            TetherError::BackendUnavailable(d) => {
                TetherError::BackendUnavailable(format!("{context}: {d}"))
            }
            TetherError::Config(d) => TetherError::Config(format!("{context}: {d}")),
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TetherError>;
