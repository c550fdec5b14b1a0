// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key derivation: PBKDF2 and HKDF over ring's HMAC digests, scrypt over the
// RustCrypto implementation.

use std::ffi::c_char;
use std::num::NonZeroU32;

use ring::{hkdf, pbkdf2};

use crate::abi::{self, INPUT, InBuf, OutBuf, guard};
use crate::codes::Code;
use crate::errors;
use crate::ops::{self, Flag};

/// Upper bound on PBKDF2 and scrypt output.
pub const PBKDF2_MAX_OUTPUT: usize = 1 << 20;

/// Upper bound on the scrypt working set, `128 * r * N` bytes.
pub const SCRYPT_MAX_MEMORY: u64 = 1 << 30;

/// Output length adapter for `hkdf::Prk::expand`.
struct OutLen(usize);

impl hkdf::KeyType for OutLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn pbkdf2_algorithm(name: &str) -> Result<pbkdf2::Algorithm, Code> {
    match name.to_ascii_uppercase().as_str() {
        "SHA1" | "SHA-1" => Ok(pbkdf2::PBKDF2_HMAC_SHA1),
        "SHA256" | "SHA-256" => Ok(pbkdf2::PBKDF2_HMAC_SHA256),
        "SHA384" | "SHA-384" => Ok(pbkdf2::PBKDF2_HMAC_SHA384),
        "SHA512" | "SHA-512" => Ok(pbkdf2::PBKDF2_HMAC_SHA512),
        _ => Err(Code::KdfUnknownDigest),
    }
}

fn hkdf_algorithm(name: &str) -> Result<hkdf::Algorithm, Code> {
    match name.to_ascii_uppercase().as_str() {
        "SHA256" | "SHA-256" => Ok(hkdf::HKDF_SHA256),
        "SHA384" | "SHA-384" => Ok(hkdf::HKDF_SHA384),
        "SHA512" | "SHA-512" => Ok(hkdf::HKDF_SHA512),
        _ => Err(Code::KdfUnknownDigest),
    }
}

/// HKDF extract-and-expand into `out`.
pub(crate) fn hkdf_fill(
    algorithm: hkdf::Algorithm,
    ikm: &[u8],
    salt: &[u8],
    info: &[&[u8]],
    out: &mut [u8],
) -> Result<(), Code> {
    let max = 255 * algorithm.hmac_algorithm().digest_algorithm().output_len();
    if out.len() > max {
        return Err(Code::KdfOutputTooLong);
    }
    hkdf::Salt::new(algorithm, salt)
        .extract(ikm)
        .expand(info, OutLen(out.len()))
        .and_then(|okm| okm.fill(out))
        .map_err(|_| {
            errors::push("HKDF expand failed");
            Code::NativeError
        })
}

/// PBKDF2 into the whole of `out`. Returns the number of bytes written.
///
/// # Safety
///
/// `digest` must be null or NUL-terminated; the buffers must describe valid
/// memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kdf_pbkdf2(
    digest: *const c_char,
    password: InBuf,
    salt: InBuf,
    iterations: i32,
    out: OutBuf,
) -> i32 {
    guard(|| {
        let password = unsafe { password.slice(&INPUT) }?;
        let salt = unsafe { salt.slice(&INPUT) }?;
        if salt.is_empty() {
            return Err(Code::KdfSaltEmpty);
        }
        let iterations = u32::try_from(iterations)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(Code::KdfIterNotPositive)?;
        let algorithm = pbkdf2_algorithm(unsafe { abi::read_name(digest) }?)?;
        let window = unsafe { out.window() }?;
        if window.len() > PBKDF2_MAX_OUTPUT {
            return Err(Code::KdfOutputTooLong);
        }
        if window.is_empty() {
            return Ok(0);
        }
        if ops::is_set(Flag::NativeError4) {
            errors::push("PBKDF2 derivation failed");
            return Err(Code::NativeError);
        }
        pbkdf2::derive(algorithm, iterations, salt, password, window);
        Ok(window.len() as i32)
    })
}

/// HKDF into the whole of `out`. An empty salt is allowed.
///
/// # Safety
///
/// As for `tether_kdf_pbkdf2`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kdf_hkdf(
    digest: *const c_char,
    ikm: InBuf,
    salt: InBuf,
    info: InBuf,
    out: OutBuf,
) -> i32 {
    guard(|| {
        let ikm = unsafe { ikm.slice(&INPUT) }?;
        let salt = unsafe { salt.slice(&INPUT) }?;
        let info = unsafe { info.slice(&INPUT) }?;
        let algorithm = hkdf_algorithm(unsafe { abi::read_name(digest) }?)?;
        let window = unsafe { out.window() }?;
        if ops::is_set(Flag::NativeError4) {
            errors::push("HKDF derivation failed");
            return Err(Code::NativeError);
        }
        hkdf_fill(algorithm, ikm, salt, &[info], window)?;
        Ok(window.len() as i32)
    })
}

/// Validates the scrypt cost. N is checked first, then r, then p.
fn scrypt_params(n: i32, r: i32, p: i32) -> Result<scrypt::Params, Code> {
    if n < 2 {
        return Err(Code::ScryptNTooSmall);
    }
    if n & (n - 1) != 0 {
        return Err(Code::ScryptNNotPow2);
    }
    let r = u32::try_from(r).ok().filter(|&r| r > 0).ok_or(Code::ScryptRNotPositive)?;
    let p = u32::try_from(p).ok().filter(|&p| p > 0).ok_or(Code::ScryptPNotPositive)?;
    if 128 * u128::from(r) * n as u128 > u128::from(SCRYPT_MAX_MEMORY) {
        errors::push(format!(
            "scrypt memory cost 128 * {r} * {n} exceeds {SCRYPT_MAX_MEMORY} bytes"
        ));
        return Err(Code::NativeError);
    }
    // `len` only matters to the password-hash encoding, which is not used.
    scrypt::Params::new(n.trailing_zeros() as u8, r, p, 32).map_err(|e| {
        errors::push(format!("scrypt parameters rejected: {e}"));
        Code::NativeError
    })
}

/// scrypt into the whole of `out`. `n` must be a power of two of at least 2;
/// `r` and `p` must be positive.
///
/// # Safety
///
/// The buffers must describe valid memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_kdf_scrypt(
    password: InBuf,
    salt: InBuf,
    n: i32,
    r: i32,
    p: i32,
    out: OutBuf,
) -> i32 {
    guard(|| {
        let password = unsafe { password.slice(&INPUT) }?;
        let salt = unsafe { salt.slice(&INPUT) }?;
        if salt.is_empty() {
            return Err(Code::KdfSaltEmpty);
        }
        let params = scrypt_params(n, r, p)?;
        let window = unsafe { out.window() }?;
        if window.len() > PBKDF2_MAX_OUTPUT {
            return Err(Code::KdfOutputTooLong);
        }
        if window.is_empty() {
            return Ok(0);
        }
        if ops::is_set(Flag::NativeError4) {
            errors::push("scrypt derivation failed");
            return Err(Code::NativeError);
        }
        scrypt::scrypt(password, salt, &params, window).map_err(|e| {
            errors::push(format!("scrypt derivation failed: {e}"));
            Code::NativeError
        })?;
        Ok(window.len() as i32)
    })
}
