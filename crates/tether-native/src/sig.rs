// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ed25519 signature contexts.
//
// A context is initialised for signing or verifying from a key spec (the key
// is copied, so the spec may be disposed afterwards), buffers the message
// through `update` and produces or checks one signature. Signing or
// verifying clears the buffered message.

use ring::signature::{self, Ed25519KeyPair, UnparsedPublicKey};
use zeroize::Zeroizing;

use crate::abi::{self, Handle, INPUT, InBuf, OutBuf, SIGNATURE, guard};
use crate::codes::Code;
use crate::errors;
use crate::ops::{self, Flag};
use crate::spec::{self, KEY_LEN, KeyKind, KeyMaterial};

pub const SIGNATURE_LEN: usize = 64;

enum Mode {
    Idle,
    Sign(Zeroizing<[u8; KEY_LEN]>),
    Verify([u8; KEY_LEN]),
}

pub struct SigCtx {
    mode: Mode,
    message: Vec<u8>,
}

unsafe fn ed25519<'a>(spec_handle: Handle) -> Result<&'a KeyMaterial, Code> {
    let key = unsafe { spec::material(spec_handle) }?;
    if key.kind != KeyKind::Ed25519 {
        return Err(Code::IncorrectKeyType);
    }
    Ok(key)
}

/// # Safety
///
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_allocate(out: *mut Handle) -> i32 {
    guard(|| {
        if out.is_null() {
            return Err(Code::OutputIsNull);
        }
        if ops::is_set(Flag::FailedCreate2) {
            return Err(Code::CreateFailed);
        }
        let ctx = SigCtx {
            mode: Mode::Idle,
            message: Vec::new(),
        };
        unsafe { abi::store_handle(out, abi::into_handle(ctx)) };
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live signature handle, and is dangling
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_dispose(handle: Handle) {
    unsafe { abi::release::<SigCtx>(handle) }
}

/// # Safety
///
/// `handle` must be zero or a live signature handle and `spec_handle` zero
/// or a live key spec handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_init_sign(handle: Handle, spec_handle: Handle) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<SigCtx>(handle) }?;
        let key = unsafe { ed25519(spec_handle) }?;
        let seed = key.private.as_ref().ok_or(Code::KeySpecHasNullKey)?;
        ctx.mode = Mode::Sign(seed.clone());
        ctx.message.clear();
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// As for `tether_sig_init_sign`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_init_verify(handle: Handle, spec_handle: Handle) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<SigCtx>(handle) }?;
        let key = unsafe { ed25519(spec_handle) }?;
        ctx.mode = Mode::Verify(key.public);
        ctx.message.clear();
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live signature handle; `input` must describe
/// readable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_update(handle: Handle, input: InBuf) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<SigCtx>(handle) }?;
        if matches!(ctx.mode, Mode::Idle) {
            return Err(Code::NotInitialized);
        }
        let data = unsafe { input.slice(&INPUT) }?;
        ctx.message.extend_from_slice(data);
        Ok(Code::Ok.raw())
    })
}

/// Sign the buffered message. A null `out` returns the signature length.
///
/// # Safety
///
/// `handle` must be zero or a live signature handle; `out` must be null or
/// describe writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_sign(handle: Handle, out: OutBuf) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<SigCtx>(handle) }?;
        let Mode::Sign(seed) = &ctx.mode else {
            return Err(Code::NotInitialized);
        };
        if ops::is_set(Flag::Int32Overflow3) {
            return Err(Code::OutputSizeIntOverflow);
        }
        let Some(window) = (unsafe { out.sized(SIGNATURE_LEN) })? else {
            return Ok(SIGNATURE_LEN as i32);
        };
        if ops::is_set(Flag::NativeError3) {
            errors::push("Ed25519 signing failed");
            return Err(Code::NativeError);
        }

        let pair = Ed25519KeyPair::from_seed_unchecked(&seed[..]).map_err(|_| {
            errors::push("Ed25519 seed rejected");
            Code::NativeError
        })?;
        let sig = pair.sign(&ctx.message);
        let produced = if ops::is_set(Flag::LenChange1) {
            sig.as_ref().len() + 1
        } else {
            sig.as_ref().len()
        };
        if produced != SIGNATURE_LEN {
            return Err(Code::UnexpectedSigLenChange);
        }
        window.copy_from_slice(sig.as_ref());
        ctx.message.clear();
        Ok(SIGNATURE_LEN as i32)
    })
}

/// Verify `sig` over the buffered message: 1 if valid, 0 if not.
///
/// # Safety
///
/// `handle` must be zero or a live signature handle; `sig` must describe
/// readable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_sig_verify(handle: Handle, sig: InBuf) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<SigCtx>(handle) }?;
        let Mode::Verify(public) = &ctx.mode else {
            return Err(Code::NotInitialized);
        };
        let sig = unsafe { sig.slice(&SIGNATURE) }?;
        if ops::is_set(Flag::NativeError3) {
            errors::push("Ed25519 verification failed");
            return Err(Code::NativeError);
        }
        let valid = UnparsedPublicKey::new(&signature::ED25519, &public[..])
            .verify(&ctx.message, sig)
            .is_ok();
        ctx.message.clear();
        Ok(i32::from(valid))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{
        tether_spec_allocate, tether_spec_decode_public, tether_spec_dispose,
        tether_spec_encode_public, tether_spec_generate,
    };

    fn new_handle(allocate: unsafe extern "C" fn(*mut Handle) -> i32) -> Handle {
        let mut h: Handle = 0;
        assert_eq!(unsafe { allocate(&mut h) }, 0);
        h
    }

    #[test]
    fn sign_and_verify_with_public_only_spec() {
        let signer_key = new_handle(tether_spec_allocate);
        let verifier_key = new_handle(tether_spec_allocate);
        let ctx = new_handle(tether_sig_allocate);
        unsafe {
            assert_eq!(tether_spec_generate(signer_key, KeyKind::Ed25519 as i32), 0);
            let mut public = [0u8; 32];
            tether_spec_encode_public(signer_key, OutBuf::new(&mut public, 0, 32));
            assert_eq!(
                tether_spec_decode_public(verifier_key, KeyKind::Ed25519 as i32, InBuf::whole(&public)),
                0
            );

            assert_eq!(tether_sig_init_sign(ctx, signer_key), 0);
            assert_eq!(tether_sig_update(ctx, InBuf::whole(b"hello ")), 0);
            assert_eq!(tether_sig_update(ctx, InBuf::whole(b"world")), 0);
            let mut sig = [0u8; SIGNATURE_LEN];
            assert_eq!(tether_sig_sign(ctx, OutBuf::new(&mut sig, 0, 64)), 64);

            assert_eq!(tether_sig_init_verify(ctx, verifier_key), 0);
            tether_sig_update(ctx, InBuf::whole(b"hello world"));
            assert_eq!(tether_sig_verify(ctx, InBuf::whole(&sig)), 1);

            tether_sig_update(ctx, InBuf::whole(b"hello there"));
            assert_eq!(tether_sig_verify(ctx, InBuf::whole(&sig)), 0);

            tether_sig_dispose(ctx);
            tether_spec_dispose(signer_key);
            tether_spec_dispose(verifier_key);
        }
    }

    #[test]
    fn uninitialised_and_public_only() {
        let key = new_handle(tether_spec_allocate);
        let ctx = new_handle(tether_sig_allocate);
        unsafe {
            assert_eq!(tether_sig_update(ctx, InBuf::whole(b"x")), Code::NotInitialized.raw());
            assert_eq!(tether_sig_sign(ctx, OutBuf::null()), Code::NotInitialized.raw());
            assert_eq!(tether_sig_init_sign(ctx, key), Code::KeySpecHasNullKey.raw());

            let public = [9u8; 32];
            tether_spec_decode_public(key, KeyKind::Ed25519 as i32, InBuf::whole(&public));
            assert_eq!(tether_sig_init_sign(ctx, key), Code::KeySpecHasNullKey.raw());
            assert_eq!(tether_sig_init_verify(ctx, key), 0);
            assert_eq!(tether_sig_verify(ctx, InBuf::null()), Code::SigIsNull.raw());

            tether_sig_dispose(ctx);
            tether_spec_dispose(key);
        }
    }
}
