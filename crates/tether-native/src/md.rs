// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message digest contexts.
//
// SHA-1 and the SHA-2 family come from ring, BLAKE3 (an XOF) from blake3.
// Finalizing writes the digest and leaves the context reset, ready for the
// next message.

use std::ffi::c_char;

use ring::digest;

use crate::abi::{self, Handle, INPUT, InBuf, OutBuf, guard};
use crate::codes::Code;
use crate::errors;
use crate::ops::{self, Flag};

/// BLAKE3 output length when the caller does not ask for one.
const BLAKE3_DEFAULT_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sha512_256,
    Blake3,
}

impl Algorithm {
    fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        let algorithm = match upper.as_str() {
            "SHA1" | "SHA-1" => Algorithm::Sha1,
            "SHA256" | "SHA-256" | "SHA2-256" => Algorithm::Sha256,
            "SHA384" | "SHA-384" | "SHA2-384" => Algorithm::Sha384,
            "SHA512" | "SHA-512" | "SHA2-512" => Algorithm::Sha512,
            "SHA512-256" | "SHA-512/256" | "SHA2-512/256" => Algorithm::Sha512_256,
            "BLAKE3" => Algorithm::Blake3,
            _ => return None,
        };
        Some(algorithm)
    }

    fn ring(self) -> Option<&'static digest::Algorithm> {
        match self {
            Algorithm::Sha1 => Some(&digest::SHA1_FOR_LEGACY_USE_ONLY),
            Algorithm::Sha256 => Some(&digest::SHA256),
            Algorithm::Sha384 => Some(&digest::SHA384),
            Algorithm::Sha512 => Some(&digest::SHA512),
            Algorithm::Sha512_256 => Some(&digest::SHA512_256),
            Algorithm::Blake3 => None,
        }
    }
}

enum State {
    Ring(digest::Context),
    Blake3(Box<blake3::Hasher>),
}

pub struct MdCtx {
    algorithm: Algorithm,
    out_len: usize,
    state: State,
}

impl MdCtx {
    fn new(algorithm: Algorithm, out_len: usize) -> Self {
        Self {
            algorithm,
            out_len,
            state: Self::fresh(algorithm),
        }
    }

    fn fresh(algorithm: Algorithm) -> State {
        match algorithm.ring() {
            Some(alg) => State::Ring(digest::Context::new(alg)),
            None => State::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Ring(ctx) => ctx.update(data),
            State::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn reset(&mut self) {
        self.state = Self::fresh(self.algorithm);
    }

    fn finish_into(&mut self, out: &mut [u8]) {
        match &self.state {
            State::Ring(ctx) => out.copy_from_slice(ctx.clone().finish().as_ref()),
            State::Blake3(hasher) => hasher.finalize_xof().fill(out),
        }
        self.reset();
    }

    fn reported_len(&self) -> Result<i32, Code> {
        if ops::is_set(Flag::Int32Overflow1) {
            return Err(Code::OutputTooLongInt32);
        }
        i32::try_from(self.out_len).map_err(|_| Code::OutputTooLongInt32)
    }
}

/// Allocate a digest context for `name`. `xof_len` selects the output length
/// of an XOF and must be zero for fixed-length digests.
///
/// # Safety
///
/// `name` must be null or NUL-terminated; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_allocate(
    name: *const c_char,
    xof_len: i32,
    out: *mut Handle,
) -> i32 {
    guard(|| {
        if out.is_null() {
            return Err(Code::OutputIsNull);
        }
        let name = unsafe { abi::read_name(name) }?;
        let algorithm = Algorithm::from_name(name).ok_or(Code::NameNotFound)?;
        if xof_len < 0 {
            return Err(Code::XofLenInvalid);
        }
        if ops::is_set(Flag::FailedCreate1) {
            return Err(Code::CreateFailed);
        }
        if ops::is_set(Flag::FailedInit1) {
            return Err(Code::InitFailed);
        }

        let out_len = match algorithm.ring() {
            Some(alg) => {
                if xof_len != 0 {
                    errors::push(format!("{name} is not an XOF, output length is fixed"));
                    return Err(Code::SetParamFailed);
                }
                alg.output_len()
            }
            None => {
                if ops::is_set(Flag::FailedSet1) {
                    errors::push("unable to set XOF output length");
                    return Err(Code::SetParamFailed);
                }
                if xof_len == 0 {
                    BLAKE3_DEFAULT_LEN
                } else {
                    xof_len as usize
                }
            }
        };

        unsafe { abi::store_handle(out, abi::into_handle(MdCtx::new(algorithm, out_len))) };
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live digest handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_update_byte(handle: Handle, byte: u8) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<MdCtx>(handle) }?;
        if ops::is_set(Flag::NativeError1) {
            errors::push("digest update failed");
            return Err(Code::NativeError);
        }
        ctx.update(&[byte]);
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live digest handle; `input` must describe
/// readable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_update(handle: Handle, input: InBuf) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<MdCtx>(handle) }?;
        let data = unsafe { input.slice(&INPUT) }?;
        if ops::is_set(Flag::NativeError1) {
            errors::push("digest update failed");
            return Err(Code::NativeError);
        }
        ctx.update(data);
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live digest handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_output_len(handle: Handle) -> i32 {
    guard(|| unsafe { abi::context::<MdCtx>(handle) }?.reported_len())
}

/// Write the digest into `out` and reset the context. With a null `out`,
/// return the digest length without touching the context.
///
/// # Safety
///
/// `handle` must be zero or a live digest handle; `out` must be null or
/// describe writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_finalize(handle: Handle, out: OutBuf) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<MdCtx>(handle) }?;
        let len = ctx.reported_len()?;
        let Some(window) = (unsafe { out.sized(len as usize) })? else {
            return Ok(len);
        };
        if ops::is_set(Flag::NativeError2) {
            errors::push("digest finalize failed");
            return Err(Code::NativeError);
        }
        ctx.finish_into(window);
        Ok(len)
    })
}

/// # Safety
///
/// `handle` must be zero or a live digest handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_reset(handle: Handle) -> i32 {
    guard(|| {
        let ctx = unsafe { abi::context::<MdCtx>(handle) }?;
        ctx.reset();
        Ok(Code::Ok.raw())
    })
}

/// # Safety
///
/// `handle` must be zero or a live digest handle, and is dangling afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_md_dispose(handle: Handle) {
    unsafe { abi::release::<MdCtx>(handle) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(name: &std::ffi::CStr, xof_len: i32) -> Result<Handle, i32> {
        let mut handle: Handle = 0;
        let status = unsafe { tether_md_allocate(name.as_ptr(), xof_len, &mut handle) };
        if status < 0 { Err(status) } else { Ok(handle) }
    }

    fn digest(handle: Handle, data: &[u8]) -> Vec<u8> {
        unsafe {
            assert_eq!(tether_md_update(handle, InBuf::whole(data)), 0);
            let len = tether_md_finalize(handle, OutBuf::null());
            let mut out = vec![0u8; len as usize];
            let written = tether_md_finalize(handle, OutBuf::new(&mut out, 0, len));
            assert_eq!(written, len);
            out
        }
    }

    #[test]
    fn sha256_known_value() {
        let h = allocate(c"SHA-256", 0).unwrap();
        assert_eq!(
            hex::encode(digest(h, b"hello")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        // Finalize resets, so the same context hashes the next message.
        assert_eq!(
            hex::encode(digest(h, b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        unsafe { tether_md_dispose(h) };
    }

    #[test]
    fn names_are_case_insensitive() {
        let h = allocate(c"sha512", 0).unwrap();
        assert_eq!(unsafe { tether_md_output_len(h) }, 64);
        unsafe { tether_md_dispose(h) };
    }

    #[test]
    fn blake3_xof_length() {
        let h = allocate(c"BLAKE3", 100).unwrap();
        assert_eq!(unsafe { tether_md_output_len(h) }, 100);
        let out = digest(h, b"abc");
        assert_eq!(out.len(), 100);

        let mut expected = [0u8; 100];
        blake3::Hasher::new()
            .update(b"abc")
            .finalize_xof()
            .fill(&mut expected);
        assert_eq!(out, expected);
        unsafe { tether_md_dispose(h) };
    }

    #[test]
    fn allocation_failures() {
        assert_eq!(allocate(c"MD5", 0).unwrap_err(), Code::NameNotFound.raw());
        assert_eq!(allocate(c"SHA-256", -1).unwrap_err(), Code::XofLenInvalid.raw());
        assert_eq!(allocate(c"SHA-256", 48).unwrap_err(), Code::SetParamFailed.raw());

        let mut handle: Handle = 0;
        let status = unsafe { tether_md_allocate(std::ptr::null(), 0, &mut handle) };
        assert_eq!(status, Code::NameIsNull.raw());
        assert_eq!(handle, 0);
    }

    #[test]
    fn finalize_into_small_buffer() {
        let h = allocate(c"SHA-1", 0).unwrap();
        let mut out = [0u8; 10];
        let status = unsafe { tether_md_finalize(h, OutBuf::new(&mut out, 0, 10)) };
        assert_eq!(status, Code::OutputTooSmall.raw());
        unsafe { tether_md_dispose(h) };
    }

    #[test]
    fn zero_handle_is_rejected() {
        assert_eq!(unsafe { tether_md_update_byte(0, 1) }, Code::InvalidHandle.raw());
        assert_eq!(unsafe { tether_md_reset(0) }, Code::InvalidHandle.raw());
        unsafe { tether_md_dispose(0) };
    }
}
