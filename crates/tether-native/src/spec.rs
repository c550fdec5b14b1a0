// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key specs: containers for one Ed25519 or X25519 key, raw 32-byte
// encodings in and out. Private material is zeroized when replaced or
// disposed.

use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::abi::{self, Handle, INPUT, InBuf, OutBuf, guard};
use crate::codes::Code;
use crate::errors;
use crate::ops::{self, Flag};

pub(crate) const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub(crate) enum KeyKind {
    Ed25519 = 1,
    X25519 = 2,
}

impl KeyKind {
    fn from_raw(raw: i32) -> Result<Self, Code> {
        match raw {
            1 => Ok(KeyKind::Ed25519),
            2 => Ok(KeyKind::X25519),
            _ => Err(Code::UnknownKeyType),
        }
    }

    fn public_from_private(self, private: &[u8; KEY_LEN]) -> Result<[u8; KEY_LEN], Code> {
        match self {
            KeyKind::Ed25519 => {
                let pair = Ed25519KeyPair::from_seed_unchecked(private).map_err(|_| {
                    errors::push("Ed25519 seed rejected");
                    Code::NativeError
                })?;
                let mut public = [0u8; KEY_LEN];
                public.copy_from_slice(pair.public_key().as_ref());
                Ok(public)
            }
            KeyKind::X25519 => {
                let secret = StaticSecret::from(*private);
                Ok(PublicKey::from(&secret).to_bytes())
            }
        }
    }
}

pub(crate) struct KeyMaterial {
    pub(crate) kind: KeyKind,
    pub(crate) public: [u8; KEY_LEN],
    pub(crate) private: Option<Zeroizing<[u8; KEY_LEN]>>,
}

#[derive(Default)]
pub struct KeySpec {
    key: Option<KeyMaterial>,
}

/// Borrow the key held by a spec handle.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle.
pub(crate) unsafe fn material<'a>(handle: Handle) -> Result<&'a KeyMaterial, Code> {
    let spec = unsafe { abi::context::<KeySpec>(handle) }?;
    spec.key.as_ref().ok_or(Code::KeySpecHasNullKey)
}

pub(crate) fn random_bytes() -> Result<Zeroizing<[u8; KEY_LEN]>, Code> {
    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    SystemRandom::new().fill(&mut bytes[..]).map_err(|_| {
        errors::push("system random source failed");
        Code::NativeError
    })?;
    Ok(bytes)
}

fn key_bytes(data: &[u8], wrong_len: Code) -> Result<[u8; KEY_LEN], Code> {
    data.try_into().map_err(|_| wrong_len)
}

/// # Safety
///
/// `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_allocate(out: *mut Handle) -> i32 {
    guard(|| {
        if out.is_null() {
            return Err(Code::OutputIsNull);
        }
        if ops::is_set(Flag::FailedCreate2) {
            return Err(Code::CreateFailed);
        }
        unsafe { abi::store_handle(out, abi::into_handle(KeySpec::default())) };
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live key spec handle, and is dangling
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_dispose(handle: Handle) {
    unsafe { abi::release::<KeySpec>(handle) }
}

/// Generate a fresh key of `key_type` into the spec.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_generate(handle: Handle, key_type: i32) -> i32 {
    guard(|| {
        let spec = unsafe { abi::context::<KeySpec>(handle) }?;
        let kind = KeyKind::from_raw(key_type)?;
        let private = random_bytes()?;
        let public = kind.public_from_private(&private)?;
        spec.key = Some(KeyMaterial {
            kind,
            public,
            private: Some(private),
        });
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live key spec handle; `input` must describe
/// readable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_decode_public(
    handle: Handle,
    key_type: i32,
    input: InBuf,
) -> i32 {
    guard(|| {
        let spec = unsafe { abi::context::<KeySpec>(handle) }?;
        let kind = KeyKind::from_raw(key_type)?;
        let data = unsafe { input.slice(&INPUT) }?;
        let public = key_bytes(data, Code::EncodedPublicKeyLen)?;
        if ops::is_set(Flag::PointerChange) {
            return Err(Code::UnexpectedPointerChange);
        }
        spec.key = Some(KeyMaterial {
            kind,
            public,
            private: None,
        });
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// As for `tether_spec_decode_public`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_decode_private(
    handle: Handle,
    key_type: i32,
    input: InBuf,
) -> i32 {
    guard(|| {
        let spec = unsafe { abi::context::<KeySpec>(handle) }?;
        let kind = KeyKind::from_raw(key_type)?;
        let data = unsafe { input.slice(&INPUT) }?;
        let private = Zeroizing::new(key_bytes(data, Code::EncodedPrivateKeyLen)?);
        if ops::is_set(Flag::PointerChange) {
            return Err(Code::UnexpectedPointerChange);
        }
        let public = kind.public_from_private(&private)?;
        spec.key = Some(KeyMaterial {
            kind,
            public,
            private: Some(private),
        });
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `out` must be null or describe writable memory.
unsafe fn encode(bytes: &[u8], out: OutBuf) -> Result<i32, Code> {
    if ops::is_set(Flag::Int32Overflow2) {
        return Err(Code::OutputSizeIntOverflow);
    }
    let len = bytes.len() as i32;
    if let Some(window) = unsafe { out.sized(bytes.len()) }? {
        window.copy_from_slice(bytes);
    }
    Ok(len)
}

/// Write the raw public key. A null `out` returns its length.
///
/// # Safety
///
/// `handle` must be zero or a live key spec handle; `out` must be null or
/// describe writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_encode_public(handle: Handle, out: OutBuf) -> i32 {
    guard(|| {
        let key = unsafe { material(handle) }?;
        unsafe { encode(&key.public, out) }
    })
}

/// Write the raw private key. A null `out` returns its length.
///
/// # Safety
///
/// As for `tether_spec_encode_public`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_encode_private(handle: Handle, out: OutBuf) -> i32 {
    guard(|| {
        let key = unsafe { material(handle) }?;
        let private = key.private.as_ref().ok_or(Code::KeySpecHasNullKey)?;
        unsafe { encode(&private[..], out) }
    })
}

/// # Safety
///
/// `handle` must be zero or a live key spec handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_spec_key_type(handle: Handle) -> i32 {
    guard(|| Ok(unsafe { material(handle) }?.kind as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_spec() -> Handle {
        let mut handle: Handle = 0;
        assert_eq!(unsafe { tether_spec_allocate(&mut handle) }, 0);
        handle
    }

    fn public_of(handle: Handle) -> Vec<u8> {
        let mut out = vec![0u8; KEY_LEN];
        let n = unsafe { tether_spec_encode_public(handle, OutBuf::new(&mut out, 0, 32)) };
        assert_eq!(n, 32);
        out
    }

    #[test]
    fn empty_spec_has_no_key() {
        let h = new_spec();
        assert_eq!(unsafe { tether_spec_key_type(h) }, Code::KeySpecHasNullKey.raw());
        assert_eq!(
            unsafe { tether_spec_encode_public(h, OutBuf::null()) },
            Code::KeySpecHasNullKey.raw()
        );
        unsafe { tether_spec_dispose(h) };
    }

    #[test]
    fn private_decode_derives_public() {
        let seed = [7u8; 32];
        let a = new_spec();
        let b = new_spec();
        unsafe {
            assert_eq!(tether_spec_decode_private(a, 2, InBuf::whole(&seed)), 0);
            assert_eq!(tether_spec_key_type(a), KeyKind::X25519 as i32);
            let public = public_of(a);
            assert_eq!(tether_spec_decode_public(b, 2, InBuf::whole(&public)), 0);
            assert_eq!(tether_spec_encode_private(b, OutBuf::null()), Code::KeySpecHasNullKey.raw());
            assert_eq!(public_of(b), public);
            tether_spec_dispose(a);
            tether_spec_dispose(b);
        }
    }

    #[test]
    fn generate_then_export() {
        let h = new_spec();
        unsafe {
            assert_eq!(tether_spec_generate(h, 1), 0);
            assert_eq!(tether_spec_encode_private(h, OutBuf::null()), 32);
            assert_eq!(tether_spec_generate(h, 9), Code::UnknownKeyType.raw());
            tether_spec_dispose(h);
        }
    }

    #[test]
    fn wrong_lengths_rejected() {
        let h = new_spec();
        let short = [1u8; 31];
        unsafe {
            assert_eq!(
                tether_spec_decode_public(h, 1, InBuf::whole(&short)),
                Code::EncodedPublicKeyLen.raw()
            );
            assert_eq!(
                tether_spec_decode_private(h, 1, InBuf::whole(&short)),
                Code::EncodedPrivateKeyLen.raw()
            );
            tether_spec_dispose(h);
        }
    }
}
