// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The backend and registry an adapter is created against.

use std::sync::Arc;

use tether_bridge::Services;
use tether_core::{NativeHandle, Result};
use tether_disposal::{HandleOwner, Registry};

/// Services plus the registry that owners are tracked in.
///
/// `Context::global()` is the process-wide pair. Tests and embedders that
/// want isolation build their own with `Context::new`.
#[derive(Clone)]
pub struct Context {
    services: Services,
    registry: Arc<Registry>,
}

impl Context {
    pub fn global() -> Result<Self> {
        Ok(Self {
            services: *tether_bridge::services(),
            registry: Arc::clone(Registry::global()?),
        })
    }

    pub fn new(services: Services, registry: Arc<Registry>) -> Self {
        Self { services, registry }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn own(
        &self,
        handle: NativeHandle,
        domain: &str,
        release: impl Fn(&NativeHandle) + Send + Sync + 'static,
    ) -> Result<HandleOwner> {
        HandleOwner::register_in(&self.registry, handle, domain, release)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.services.kind())
            .field("live_owners", &self.registry.live_count())
            .finish()
    }
}
