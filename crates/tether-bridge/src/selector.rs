// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend selection.
//
// The backend is chosen once per process, on first use, from the configured
// preference. Every thread then sees the same `Services` value and the same
// per-domain singletons.

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use tether_core::{BackendKind, BackendPreference, Result, TetherConfig};
use tether_native::INTERFACE_VERSION;
use tracing::{error, info, warn};

use crate::dispatch::DISPATCH;
use crate::dynamic::DynamicBackend;
use crate::traits::{
    DigestService, KdfService, KemService, KeySpecService, NativeTable, OpsTestService,
    SignatureService,
};

/// Per-domain service singletons of one backend.
#[derive(Clone, Copy)]
pub struct Services {
    kind: BackendKind,
    pub digest: &'static dyn DigestService,
    pub key_spec: &'static dyn KeySpecService,
    pub kem: &'static dyn KemService,
    pub kdf: &'static dyn KdfService,
    pub signature: &'static dyn SignatureService,
    pub ops_test: &'static dyn OpsTestService,
}

impl Services {
    pub fn from_backend<B: NativeTable>(backend: &'static B) -> Self {
        Self {
            kind: backend.kind(),
            digest: backend,
            key_spec: backend,
            kem: backend,
            kdf: backend,
            signature: backend,
            ops_test: backend,
        }
    }

    /// The statically linked dispatch backend.
    pub fn dispatch() -> Self {
        Self::from_backend(&DISPATCH)
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("kind", &self.kind).finish()
    }
}

/// What the selector chose and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionReport {
    pub backend: BackendKind,
    pub requested: BackendPreference,
    /// Outcome of the dynamic probe, or why it was skipped.
    pub probe: String,
    pub interface_version: u32,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub services: Services,
    pub report: SelectionReport,
}

/// Choose a backend for `requested` without touching the process-wide
/// selection.
pub fn select_with(requested: BackendPreference) -> Selection {
    select_from(requested, DynamicBackend::shared)
}

/// Choose a backend for `requested`, calling `resolve` for the dynamic path.
/// `resolve` is not called when dispatch is requested.
pub fn select_from(
    requested: BackendPreference,
    resolve: impl FnOnce() -> Result<&'static DynamicBackend>,
) -> Selection {
    let (services, outcome) = match requested {
        BackendPreference::Dispatch => {
            (Services::dispatch(), "not attempted, dispatch requested".to_string())
        }
        BackendPreference::Auto | BackendPreference::Dynamic => match resolve() {
            Ok(backend) => (
                Services::from_backend(backend),
                format!(
                    "resolved from {}, interface version {}",
                    backend.source(),
                    backend.version()
                ),
            ),
            Err(e) => {
                if requested == BackendPreference::Dynamic {
                    error!(error = %e, "dynamic backend requested but unavailable, using dispatch");
                } else {
                    warn!(error = %e, "dynamic backend did not resolve, using dispatch");
                }
                (Services::dispatch(), e.to_string())
            }
        },
    };

    let report = SelectionReport {
        backend: services.kind(),
        requested,
        probe: outcome,
        interface_version: INTERFACE_VERSION,
    };
    Selection { services, report }
}

static SELECTION: OnceLock<Selection> = OnceLock::new();

fn global() -> &'static Selection {
    SELECTION.get_or_init(|| {
        let selection = select_with(TetherConfig::global().backend);
        info!(
            backend = %selection.report.backend,
            requested = %selection.report.requested,
            probe = %selection.report.probe,
            "native backend selected"
        );
        selection
    })
}

/// The process-wide services, selected on first call.
pub fn services() -> &'static Services {
    &global().services
}

/// How the process-wide backend was selected.
pub fn selection() -> &'static SelectionReport {
    &global().report
}
