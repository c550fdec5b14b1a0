// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ed25519 signing and verification.
//
// A context copies the key at construction, so the `KeySpec` may be
// disposed while the signer or verifier is still in use.

use tether_bridge::SignatureService;
use tether_core::Result;
use tether_disposal::{Dispose, HandleOwner};

use crate::context::Context;
use crate::keys::KeySpec;

struct SigContext {
    owner: HandleOwner,
    service: &'static dyn SignatureService,
}

impl SigContext {
    fn new(ctx: &Context) -> Result<Self> {
        let service = ctx.services().signature;
        let handle = service.allocate()?;
        let owner = ctx.own(handle, "Signature", move |h| {
            // SAFETY: the dispose action runs at most once per handle.
            unsafe { service.dispose(h.as_raw()) }
        })?;
        Ok(Self { owner, service })
    }

    fn raw(&self) -> usize {
        self.owner.raw()
    }

    fn update(&mut self, data: &[u8], offset: usize, len: usize) -> Result<()> {
        // SAFETY: the owner keeps the handle live for `self`'s lifetime.
        unsafe { self.service.update(self.raw(), data, offset, len) }
    }

    /// Finish initialisation with `init`, disposing the context on failure.
    fn init(self, init: impl FnOnce(&Self) -> Result<()>) -> Result<Self> {
        match init(&self) {
            Ok(()) => Ok(self),
            Err(e) => {
                self.owner.dispose();
                Err(e)
            }
        }
    }
}

/// Signs one message at a time with an Ed25519 private key.
pub struct Signer(SigContext);

impl Signer {
    pub fn new_in(ctx: &Context, key: &mut KeySpec) -> Result<Self> {
        let key = key.raw();
        SigContext::new(ctx)?
            .init(|sig| {
                // SAFETY: both handles are owned and live.
                unsafe { sig.service.init_sign(sig.raw(), key) }
            })
            .map(Signer)
    }

    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        self.0.update(data, 0, data.len())
    }

    pub fn update_range(&mut self, data: &[u8], offset: usize, len: usize) -> Result<()> {
        self.0.update(data, offset, len)
    }

    /// Sign everything fed since the last signature.
    pub fn sign(&mut self) -> Result<Vec<u8>> {
        let SigContext { owner, service } = &self.0;
        // SAFETY: the owner keeps the handle live for `self`'s lifetime.
        let len = unsafe { service.signature_len(owner.raw()) }?;
        let mut sig = vec![0u8; len];
        // SAFETY: as above.
        let written = unsafe { service.sign(owner.raw(), &mut sig) }?;
        sig.truncate(written);
        Ok(sig)
    }

    pub fn dispose(self) {
        self.0.owner.dispose();
    }
}

impl Dispose for Signer {
    fn dispose(self) {
        Signer::dispose(self);
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("owner", &self.0.owner).finish()
    }
}

/// Checks Ed25519 signatures against a public key.
pub struct Verifier(SigContext);

impl Verifier {
    pub fn new_in(ctx: &Context, key: &mut KeySpec) -> Result<Self> {
        let key = key.raw();
        SigContext::new(ctx)?
            .init(|sig| {
                // SAFETY: both handles are owned and live.
                unsafe { sig.service.init_verify(sig.raw(), key) }
            })
            .map(Verifier)
    }

    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        self.0.update(data, 0, data.len())
    }

    pub fn update_range(&mut self, data: &[u8], offset: usize, len: usize) -> Result<()> {
        self.0.update(data, offset, len)
    }

    /// Check `signature` over everything fed since the last check.
    pub fn verify(&mut self, signature: &[u8]) -> Result<bool> {
        // SAFETY: the owner keeps the handle live for `self`'s lifetime.
        unsafe { self.0.service.verify(self.0.raw(), signature) }
    }

    pub fn dispose(self) {
        self.0.owner.dispose();
    }
}

impl Dispose for Verifier {
    fn dispose(self) {
        Verifier::dispose(self);
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").field("owner", &self.0.owner).finish()
    }
}
