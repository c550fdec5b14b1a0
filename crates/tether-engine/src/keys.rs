// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key specs: native containers for one Ed25519 or X25519 key.

use tether_bridge::{KeyPart, Services};
use tether_core::{KeyType, Result};
use tether_disposal::{Dispose, HandleOwner};
use zeroize::Zeroizing;

use crate::context::Context;

/// A native key spec holding a public key and, optionally, its private half.
pub struct KeySpec {
    owner: HandleOwner,
    services: Services,
}

impl KeySpec {
    fn allocate_in(ctx: &Context) -> Result<Self> {
        let services = *ctx.services();
        let service = services.key_spec;
        let handle = service.allocate()?;
        let owner = ctx.own(handle, "KeySpec", move |h| {
            // SAFETY: the dispose action runs at most once per handle.
            unsafe { service.dispose(h.as_raw()) }
        })?;
        Ok(Self { owner, services })
    }

    /// Run `init` on a fresh spec; dispose it again if `init` fails.
    fn initialised(
        ctx: &Context,
        init: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Self> {
        let mut spec = Self::allocate_in(ctx)?;
        match init(&mut spec) {
            Ok(()) => Ok(spec),
            Err(e) => {
                spec.dispose();
                Err(e)
            }
        }
    }

    /// Generate a fresh key pair in the process-wide context.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        Self::generate_in(&Context::global()?, key_type)
    }

    pub fn generate_in(ctx: &Context, key_type: KeyType) -> Result<Self> {
        Self::initialised(ctx, |spec| {
            // SAFETY: `spec` owns a live key spec handle.
            unsafe { spec.services.key_spec.generate(spec.raw(), key_type) }
        })
    }

    /// A public-only spec from its encoding.
    pub fn from_public_in(ctx: &Context, key_type: KeyType, encoded: &[u8]) -> Result<Self> {
        Self::initialised(ctx, |spec| spec.decode(KeyPart::Public, key_type, encoded))
    }

    /// A full key pair from the encoded private key.
    pub fn from_private_in(ctx: &Context, key_type: KeyType, encoded: &[u8]) -> Result<Self> {
        Self::initialised(ctx, |spec| spec.decode(KeyPart::Private, key_type, encoded))
    }

    fn decode(&mut self, part: KeyPart, key_type: KeyType, encoded: &[u8]) -> Result<()> {
        // SAFETY: the owner keeps the handle live for `self`'s lifetime.
        unsafe {
            self.services
                .key_spec
                .decode(self.raw(), part, key_type, encoded)
        }
    }

    fn encode(&mut self, part: KeyPart) -> Result<Zeroizing<Vec<u8>>> {
        let service = self.services.key_spec;
        // SAFETY: as above.
        let len = unsafe { service.encoded_len(self.raw(), part) }?;
        let mut out = Zeroizing::new(vec![0u8; len]);
        // SAFETY: as above.
        let written = unsafe { service.encode(self.raw(), part, &mut out) }?;
        out.truncate(written);
        Ok(out)
    }

    pub fn public_key(&mut self) -> Result<Vec<u8>> {
        Ok(self.encode(KeyPart::Public)?.to_vec())
    }

    /// The encoded private key. Fails for public-only specs.
    pub fn private_key(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        self.encode(KeyPart::Private)
    }

    pub fn key_type(&mut self) -> Result<KeyType> {
        // SAFETY: as above.
        unsafe { self.services.key_spec.key_type(self.raw()) }
    }

    pub(crate) fn raw(&self) -> usize {
        self.owner.raw()
    }

    pub(crate) fn services(&self) -> &Services {
        &self.services
    }

    pub fn dispose(self) {
        self.owner.dispose();
    }
}

impl Dispose for KeySpec {
    fn dispose(self) {
        KeySpec::dispose(self);
    }
}

impl std::fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySpec").field("owner", &self.owner).finish()
    }
}

#[cfg(test)]
mod tests {
    use tether_core::{ErrorClass, FailureKind, OpsFlag};

    use super::*;
    use crate::ops::FaultInjection;
    use crate::test_support::context;

    #[test]
    fn export_and_reimport() {
        let ctx = context();
        let mut original = KeySpec::generate_in(&ctx, KeyType::Ed25519).unwrap();
        assert_eq!(original.key_type().unwrap(), KeyType::Ed25519);
        let public = original.public_key().unwrap();
        let private = original.private_key().unwrap();
        assert_eq!((public.len(), private.len()), (32, 32));

        let mut restored = KeySpec::from_private_in(&ctx, KeyType::Ed25519, &private).unwrap();
        assert_eq!(restored.public_key().unwrap(), public);

        let mut public_only = KeySpec::from_public_in(&ctx, KeyType::Ed25519, &public).unwrap();
        let err = public_only.private_key().unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));

        for spec in [original, restored, public_only] {
            spec.dispose();
        }
        assert_eq!(ctx.registry().live_count(), 0);
    }

    #[test]
    fn bad_encoding_disposes_the_spec() {
        let ctx = context();
        let err = KeySpec::from_public_in(&ctx, KeyType::X25519, &[1u8; 31]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::InputValidation);
        let stats = ctx.registry().stats();
        assert_eq!((stats.registered, stats.explicit, stats.live), (1, 1, 0));
    }

    #[test]
    fn injected_pointer_change() {
        let ctx = context();
        let faults = FaultInjection::new(&ctx).unwrap();
        let _guard = faults.inject(OpsFlag::PointerChange).unwrap();
        let err = KeySpec::from_public_in(&ctx, KeyType::X25519, &[1u8; 32]).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::UnexpectedPointerChange));
        assert_eq!(err.class(), ErrorClass::ContractViolation);
    }
}
