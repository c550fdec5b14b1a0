// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The owning wrapper around one native handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tether_core::{NativeHandle, Result};
use tracing::instrument;

use crate::action::DisposeAction;
use crate::registry::{Registry, SlotKey};
use crate::scope::Dispose;

/// Sole owner of a native handle.
///
/// Not `Clone`. Equality and hashing follow the handle value. The handle is
/// released exactly once: by `dispose`, or by the registry's daemon after
/// the owner is dropped.
pub struct HandleOwner {
    registry: Arc<Registry>,
    key: SlotKey,
    action: Arc<DisposeAction>,
    // Its strong count reaching zero is what the sweep looks for.
    _liveness: Arc<()>,
    label: String,
    disposed: bool,
}

impl HandleOwner {
    /// Take ownership of `handle` in the process-wide registry.
    ///
    /// `name` identifies the domain in log output; `release` is the domain
    /// function that frees the handle.
    pub fn new(
        handle: NativeHandle,
        name: &str,
        release: impl Fn(&NativeHandle) + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::register_in(Registry::global()?, handle, name, release)
    }

    /// As `new`, in a specific registry.
    #[instrument(level = "debug", skip(registry, handle, release), fields(handle = %handle))]
    pub fn register_in(
        registry: &Arc<Registry>,
        handle: NativeHandle,
        name: &str,
        release: impl Fn(&NativeHandle) + Send + Sync + 'static,
    ) -> Result<Self> {
        let label = format!("Reference({name}) {handle}");
        let action = Arc::new(DisposeAction::new(handle, release));
        let liveness = Arc::new(());
        let key = registry.register(Arc::clone(&action), label.clone(), &liveness)?;
        Ok(Self {
            registry: Arc::clone(registry),
            key,
            action,
            _liveness: liveness,
            label,
            disposed: false,
        })
    }

    pub fn handle(&self) -> &NativeHandle {
        self.action.handle()
    }

    /// Raw handle value for passing to native calls.
    pub fn raw(&self) -> usize {
        self.action.handle().as_raw()
    }

    /// `Reference(<domain>) <handle>`, as used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed || self.action.is_completed()
    }

    /// Release the handle now, on this thread.
    pub fn dispose(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.registry.dispose_now(self.key, &self.action);
        }
    }
}

impl Dispose for HandleOwner {
    fn dispose(self) {
        HandleOwner::dispose(self);
    }
}

impl Drop for HandleOwner {
    fn drop(&mut self) {
        if !self.disposed {
            self.registry.notify_unreachable(self.key);
        }
    }
}

impl PartialEq for HandleOwner {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for HandleOwner {}

impl Hash for HandleOwner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw().hash(state);
    }
}

impl fmt::Debug for HandleOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleOwner")
            .field("label", &self.label)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
