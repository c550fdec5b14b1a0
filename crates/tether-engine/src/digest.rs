// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message digests.

use tether_bridge::DigestService;
use tether_core::Result;
use tether_disposal::{Dispose, HandleOwner};
use tracing::debug;

use crate::context::Context;

/// A native digest context.
///
/// Finalizing resets the context, so one `Digest` can hash any number of
/// messages in turn.
pub struct Digest {
    owner: HandleOwner,
    service: &'static dyn DigestService,
    algorithm: String,
}

impl Digest {
    /// A digest for `algorithm` (e.g. `"SHA-256"`, `"BLAKE3"`) in the
    /// process-wide context.
    pub fn new(algorithm: &str) -> Result<Self> {
        Self::new_in(&Context::global()?, algorithm)
    }

    pub fn new_in(ctx: &Context, algorithm: &str) -> Result<Self> {
        Self::with_xof_in(ctx, algorithm, 0)
    }

    /// An extendable-output digest producing `xof_len` bytes. Fixed-length
    /// algorithms reject any non-zero length.
    pub fn with_xof_in(ctx: &Context, algorithm: &str, xof_len: usize) -> Result<Self> {
        let service = ctx.services().digest;
        let handle = service.allocate(algorithm, xof_len)?;
        let owner = ctx.own(handle, "Digest", move |h| {
            // SAFETY: the dispose action runs at most once per handle.
            unsafe { service.dispose(h.as_raw()) }
        })?;
        debug!(algorithm, label = owner.label(), "digest allocated");
        Ok(Self {
            owner,
            service,
            algorithm: algorithm.to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        self.update_range(data, 0, data.len())
    }

    /// Feed `len` bytes of `data` starting at `offset`.
    pub fn update_range(&mut self, data: &[u8], offset: usize, len: usize) -> Result<()> {
        // SAFETY: the owner keeps the handle live for `self`'s lifetime.
        unsafe { self.service.update(self.owner.raw(), data, offset, len) }
    }

    pub fn update_byte(&mut self, byte: u8) -> Result<()> {
        // SAFETY: as above.
        unsafe { self.service.update_byte(self.owner.raw(), byte) }
    }

    pub fn output_len(&mut self) -> Result<usize> {
        // SAFETY: as above.
        unsafe { self.service.output_len(self.owner.raw()) }
    }

    /// Write the digest to the front of `out`; returns the bytes written.
    pub fn finalize_into(&mut self, out: &mut [u8]) -> Result<usize> {
        // SAFETY: as above.
        unsafe { self.service.finalize(self.owner.raw(), out) }
    }

    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.output_len()?];
        let written = self.finalize_into(&mut out)?;
        out.truncate(written);
        Ok(out)
    }

    pub fn reset(&mut self) -> Result<()> {
        // SAFETY: as above.
        unsafe { self.service.reset(self.owner.raw()) }
    }

    /// Release the native context now.
    pub fn dispose(self) {
        self.owner.dispose();
    }
}

impl Dispose for Digest {
    fn dispose(self) {
        Digest::dispose(self);
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digest")
            .field("algorithm", &self.algorithm)
            .field("owner", &self.owner)
            .finish()
    }
}

/// One-shot digest of `data`.
pub fn digest_in(ctx: &Context, algorithm: &str, data: &[u8]) -> Result<Vec<u8>> {
    tether_disposal::scoped(Digest::new_in(ctx, algorithm)?, |d| {
        d.update(data)?;
        d.finalize()
    })
}
