// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key encapsulation to an X25519 key spec.

use tether_core::{Result, TetherError};
use zeroize::Zeroizing;

use crate::keys::KeySpec;

/// Output of `encapsulate`: send `ciphertext` to the recipient, keep
/// `secret`.
#[derive(Debug)]
pub struct Encapsulated {
    pub ciphertext: Vec<u8>,
    pub secret: Zeroizing<Vec<u8>>,
}

/// Derive a fresh shared secret for `recipient`, which needs only its
/// public key.
pub fn encapsulate(recipient: &mut KeySpec) -> Result<Encapsulated> {
    let kem = recipient.services().kem;
    let raw = recipient.raw();
    // SAFETY: `recipient` keeps its handle live for the duration of the
    // borrow.
    let (total, secret_len) = unsafe { (kem.encapsulated_len(raw)?, kem.secret_len(raw)?) };
    let ciphertext_len = total.checked_sub(secret_len).ok_or_else(|| {
        TetherError::ContractViolation(format!(
            "encapsulation length {total} shorter than secret length {secret_len}"
        ))
    })?;

    let mut sealed = Zeroizing::new(vec![0u8; total]);
    // SAFETY: as above.
    unsafe { kem.encapsulate(raw, &mut sealed) }?;
    let (ciphertext, secret) = sealed.split_at(ciphertext_len);
    Ok(Encapsulated {
        ciphertext: ciphertext.to_vec(),
        secret: Zeroizing::new(secret.to_vec()),
    })
}

/// Recover the shared secret for `ciphertext` with the recipient's private
/// key.
pub fn decapsulate(recipient: &mut KeySpec, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let kem = recipient.services().kem;
    let raw = recipient.raw();
    // SAFETY: as in `encapsulate`.
    let len = unsafe { kem.secret_len(raw) }?;
    let mut secret = Zeroizing::new(vec![0u8; len]);
    // SAFETY: as in `encapsulate`.
    let written = unsafe { kem.decapsulate(raw, ciphertext, &mut secret) }?;
    secret.truncate(written);
    Ok(secret)
}
