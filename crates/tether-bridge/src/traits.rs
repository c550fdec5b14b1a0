// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-domain service traits.
//
// Each domain exposes raw operations that return the native status code
// untouched, plus provided methods that marshal Rust arguments into buffer
// triples and translate the status. Both backends implement the raw layer
// through the same `NativeFns` table, so argument checks and status codes
// are identical whichever backend is active.
//
// Methods taking a `Handle` are `unsafe`: the handle must be live and must
// belong to the method's domain. The engine adapters uphold this by keeping
// every handle inside a `HandleOwner`.

use std::ffi::{CStr, CString};

use tether_core::{
    BackendKind, ErrorCode, KeyType, NativeHandle, OpsFlag, Result, StatusCode, TetherError,
    translate,
};
use tether_native::{Handle, InBuf, NativeFns, OutBuf};
use tracing::instrument;

// ---------------------------------------------------------------------------
// Marshalling helpers
// ---------------------------------------------------------------------------

/// Convert a length or offset to the native `i32`, failing locally with
/// `code` before any native call is made.
pub(crate) fn to_i32(value: usize, code: ErrorCode, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        TetherError::from_code(code).with_context(format!("{what} {value} exceeds i32"))
    })
}

fn in_buf(data: &[u8], offset: usize, len: usize) -> Result<InBuf> {
    Ok(InBuf::new(
        data,
        to_i32(offset, ErrorCode::InputTooLongInt32, "input offset")?,
        to_i32(len, ErrorCode::InputTooLongInt32, "input length")?,
    ))
}

fn whole(data: &[u8]) -> Result<InBuf> {
    in_buf(data, 0, data.len())
}

fn out_buf(data: &mut [u8]) -> Result<OutBuf> {
    let len = to_i32(data.len(), ErrorCode::OutputTooLongInt32, "output length")?;
    Ok(OutBuf::new(data, 0, len))
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| TetherError::InvalidArgument(format!("name {name:?} contains a NUL byte")))
}

fn allocated(raw: Handle, domain: &str) -> Result<NativeHandle> {
    NativeHandle::from_raw(raw).ok_or_else(|| {
        TetherError::ContractViolation(format!(
            "{domain} allocation reported success without a handle"
        ))
    })
}

// ---------------------------------------------------------------------------
// Backend table and status translation
// ---------------------------------------------------------------------------

/// A resolved set of native entry points.
pub trait NativeTable: Send + Sync + 'static {
    fn fns(&self) -> &NativeFns;
    fn kind(&self) -> BackendKind;
}

/// Status translation shared by every domain.
pub trait NativeErrors: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Take the calling thread's pending native error text.
    fn drain_diagnostics(&self) -> String;

    /// Translate a status code. Any failure drains the native error queue so
    /// stale text never leaks into a later error.
    fn check(&self, status: StatusCode) -> Result<usize> {
        if status >= 0 {
            return Ok(status as usize);
        }
        let diagnostics = self.drain_diagnostics();
        translate(status, move || diagnostics)
    }
}

impl<T: NativeTable> NativeErrors for T {
    fn backend(&self) -> BackendKind {
        self.kind()
    }

    fn drain_diagnostics(&self) -> String {
        let drain = self.fns().errors_drain;
        // SAFETY: a null buffer only queries the pending length.
        let pending = unsafe { drain(std::ptr::null_mut(), 0) };
        if pending <= 0 {
            return String::new();
        }
        let mut text = vec![0u8; pending as usize];
        // SAFETY: `text` is writable for its full length.
        let written = unsafe { drain(text.as_mut_ptr(), text.len()) };
        text.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&text).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

pub trait DigestService: NativeErrors {
    fn allocate_raw(&self, name: &CStr, xof_len: i32, out: &mut Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn update_byte_raw(&self, handle: Handle, byte: u8) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle and `input` must describe
    /// readable memory.
    unsafe fn update_raw(&self, handle: Handle, input: InBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn output_len_raw(&self, handle: Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle and `out` null or writable.
    unsafe fn finalize_raw(&self, handle: Handle, out: OutBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn reset_raw(&self, handle: Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live digest handle; it is dangling afterwards.
    unsafe fn dispose(&self, handle: Handle);

    /// Allocate a digest context for algorithm `name`. `xof_len` is the
    /// output length of an extendable-output function, 0 for the default.
    #[instrument(level = "debug", skip(self))]
    fn allocate(&self, name: &str, xof_len: usize) -> Result<NativeHandle> {
        let c = c_name(name)?;
        let xof = to_i32(xof_len, ErrorCode::InputTooLongInt32, "XOF length")?;
        let mut raw: Handle = 0;
        let status = self.allocate_raw(&c, xof, &mut raw);
        self.check(status)
            .map_err(|e| e.with_context(format!("digest \"{name}\"")))?;
        allocated(raw, "digest")
    }

    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn update_byte(&self, handle: Handle, byte: u8) -> Result<()> {
        // SAFETY: forwarded.
        let status = unsafe { self.update_byte_raw(handle, byte) };
        self.check(status).map(drop)
    }

    /// Feed `len` bytes of `data` starting at `offset`.
    ///
    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn update(&self, handle: Handle, data: &[u8], offset: usize, len: usize) -> Result<()> {
        let input = in_buf(data, offset, len)?;
        // SAFETY: `input` borrows `data`; handle contract forwarded.
        let status = unsafe { self.update_raw(handle, input) };
        self.check(status).map(drop)
    }

    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn output_len(&self, handle: Handle) -> Result<usize> {
        // SAFETY: forwarded.
        let status = unsafe { self.output_len_raw(handle) };
        self.check(status)
    }

    /// Write the digest to the front of `out` and reset the context.
    ///
    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn finalize(&self, handle: Handle, out: &mut [u8]) -> Result<usize> {
        let out = out_buf(out)?;
        // SAFETY: `out` borrows the caller's slice; handle contract forwarded.
        let status = unsafe { self.finalize_raw(handle, out) };
        self.check(status)
    }

    /// # Safety
    /// `handle` must be a live digest handle.
    unsafe fn reset(&self, handle: Handle) -> Result<()> {
        // SAFETY: forwarded.
        let status = unsafe { self.reset_raw(handle) };
        self.check(status).map(drop)
    }
}

impl<T: NativeTable> DigestService for T {
    fn allocate_raw(&self, name: &CStr, xof_len: i32, out: &mut Handle) -> StatusCode {
        // SAFETY: `name` is NUL-terminated and `out` is a valid handle slot.
        unsafe { (self.fns().md_allocate)(name.as_ptr(), xof_len, out) }
    }

    unsafe fn update_byte_raw(&self, handle: Handle, byte: u8) -> StatusCode {
        unsafe { (self.fns().md_update_byte)(handle, byte) }
    }

    unsafe fn update_raw(&self, handle: Handle, input: InBuf) -> StatusCode {
        unsafe { (self.fns().md_update)(handle, input) }
    }

    unsafe fn output_len_raw(&self, handle: Handle) -> StatusCode {
        unsafe { (self.fns().md_output_len)(handle) }
    }

    unsafe fn finalize_raw(&self, handle: Handle, out: OutBuf) -> StatusCode {
        unsafe { (self.fns().md_finalize)(handle, out) }
    }

    unsafe fn reset_raw(&self, handle: Handle) -> StatusCode {
        unsafe { (self.fns().md_reset)(handle) }
    }

    unsafe fn dispose(&self, handle: Handle) {
        unsafe { (self.fns().md_dispose)(handle) }
    }
}

// ---------------------------------------------------------------------------
// Key specs
// ---------------------------------------------------------------------------

/// Which half of a key pair an encode or decode call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPart {
    Public,
    Private,
}

pub trait KeySpecService: NativeErrors {
    fn allocate_raw(&self, out: &mut Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn generate_raw(&self, handle: Handle, key_type: i32) -> StatusCode;
    /// # Safety
    /// `handle` must be a live key spec handle and `input` readable.
    unsafe fn decode_raw(
        &self,
        handle: Handle,
        part: KeyPart,
        key_type: i32,
        input: InBuf,
    ) -> StatusCode;
    /// # Safety
    /// `handle` must be a live key spec handle and `out` null or writable.
    unsafe fn encode_raw(&self, handle: Handle, part: KeyPart, out: OutBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn key_type_raw(&self, handle: Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live key spec handle; it is dangling afterwards.
    unsafe fn dispose(&self, handle: Handle);

    #[instrument(level = "debug", skip(self))]
    fn allocate(&self) -> Result<NativeHandle> {
        let mut raw: Handle = 0;
        let status = self.allocate_raw(&mut raw);
        self.check(status)
            .map_err(|e| e.with_context("key spec allocation"))?;
        allocated(raw, "key spec")
    }

    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn generate(&self, handle: Handle, key_type: KeyType) -> Result<()> {
        // SAFETY: forwarded.
        let status = unsafe { self.generate_raw(handle, key_type.as_raw()) };
        self.check(status)
            .map(drop)
            .map_err(|e| e.with_context(format!("generate {}", key_type.name())))
    }

    /// Replace the spec's key with the encoded key in `data`.
    ///
    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn decode(
        &self,
        handle: Handle,
        part: KeyPart,
        key_type: KeyType,
        data: &[u8],
    ) -> Result<()> {
        let input = whole(data)?;
        // SAFETY: `input` borrows `data`; handle contract forwarded.
        let status = unsafe { self.decode_raw(handle, part, key_type.as_raw(), input) };
        self.check(status).map(drop)
    }

    /// Length of the encoding `encode` would write.
    ///
    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn encoded_len(&self, handle: Handle, part: KeyPart) -> Result<usize> {
        // SAFETY: a null output is a length query.
        let status = unsafe { self.encode_raw(handle, part, OutBuf::null()) };
        self.check(status)
    }

    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn encode(&self, handle: Handle, part: KeyPart, out: &mut [u8]) -> Result<usize> {
        let out = out_buf(out)?;
        // SAFETY: `out` borrows the caller's slice; handle contract forwarded.
        let status = unsafe { self.encode_raw(handle, part, out) };
        self.check(status)
    }

    /// # Safety
    /// `handle` must be a live key spec handle.
    unsafe fn key_type(&self, handle: Handle) -> Result<KeyType> {
        // SAFETY: forwarded.
        let status = unsafe { self.key_type_raw(handle) };
        let raw = self.check(status)?;
        i32::try_from(raw)
            .ok()
            .and_then(KeyType::from_raw)
            .ok_or_else(|| TetherError::ContractViolation(format!("unknown key type {raw}")))
    }
}

impl<T: NativeTable> KeySpecService for T {
    fn allocate_raw(&self, out: &mut Handle) -> StatusCode {
        // SAFETY: `out` is a valid handle slot.
        unsafe { (self.fns().spec_allocate)(out) }
    }

    unsafe fn generate_raw(&self, handle: Handle, key_type: i32) -> StatusCode {
        unsafe { (self.fns().spec_generate)(handle, key_type) }
    }

    unsafe fn decode_raw(
        &self,
        handle: Handle,
        part: KeyPart,
        key_type: i32,
        input: InBuf,
    ) -> StatusCode {
        let f = match part {
            KeyPart::Public => self.fns().spec_decode_public,
            KeyPart::Private => self.fns().spec_decode_private,
        };
        unsafe { f(handle, key_type, input) }
    }

    unsafe fn encode_raw(&self, handle: Handle, part: KeyPart, out: OutBuf) -> StatusCode {
        let f = match part {
            KeyPart::Public => self.fns().spec_encode_public,
            KeyPart::Private => self.fns().spec_encode_private,
        };
        unsafe { f(handle, out) }
    }

    unsafe fn key_type_raw(&self, handle: Handle) -> StatusCode {
        unsafe { (self.fns().spec_key_type)(handle) }
    }

    unsafe fn dispose(&self, handle: Handle) {
        unsafe { (self.fns().spec_dispose)(handle) }
    }
}

// ---------------------------------------------------------------------------
// Key encapsulation
// ---------------------------------------------------------------------------

pub trait KemService: NativeErrors {
    /// # Safety
    /// `spec` must be a live key spec handle and `out` null or writable.
    unsafe fn encapsulate_raw(&self, spec: Handle, out: OutBuf) -> StatusCode;
    /// # Safety
    /// `spec` must be a live key spec handle, `ciphertext` readable and
    /// `out` null or writable.
    unsafe fn decapsulate_raw(&self, spec: Handle, ciphertext: InBuf, out: OutBuf)
    -> StatusCode;
    /// # Safety
    /// `spec` must be a live key spec handle.
    unsafe fn secret_len_raw(&self, spec: Handle) -> StatusCode;

    /// Combined `ciphertext || secret` length for this recipient.
    ///
    /// # Safety
    /// `spec` must be a live key spec handle.
    unsafe fn encapsulated_len(&self, spec: Handle) -> Result<usize> {
        // SAFETY: a null output is a length query.
        let status = unsafe { self.encapsulate_raw(spec, OutBuf::null()) };
        self.check(status)
    }

    /// Write `ciphertext || secret` to the front of `out`.
    ///
    /// # Safety
    /// `spec` must be a live key spec handle.
    unsafe fn encapsulate(&self, spec: Handle, out: &mut [u8]) -> Result<usize> {
        let out = out_buf(out)?;
        // SAFETY: `out` borrows the caller's slice; handle contract forwarded.
        let status = unsafe { self.encapsulate_raw(spec, out) };
        self.check(status)
    }

    /// # Safety
    /// `spec` must be a live key spec handle.
    unsafe fn decapsulate(&self, spec: Handle, ciphertext: &[u8], out: &mut [u8]) -> Result<usize> {
        let ciphertext = whole(ciphertext)?;
        let out = out_buf(out)?;
        // SAFETY: both buffers borrow caller slices; handle contract forwarded.
        let status = unsafe { self.decapsulate_raw(spec, ciphertext, out) };
        self.check(status)
    }

    /// # Safety
    /// `spec` must be a live key spec handle.
    unsafe fn secret_len(&self, spec: Handle) -> Result<usize> {
        // SAFETY: forwarded.
        let status = unsafe { self.secret_len_raw(spec) };
        self.check(status)
    }
}

impl<T: NativeTable> KemService for T {
    unsafe fn encapsulate_raw(&self, spec: Handle, out: OutBuf) -> StatusCode {
        unsafe { (self.fns().kem_encapsulate)(spec, out) }
    }

    unsafe fn decapsulate_raw(
        &self,
        spec: Handle,
        ciphertext: InBuf,
        out: OutBuf,
    ) -> StatusCode {
        unsafe { (self.fns().kem_decapsulate)(spec, ciphertext, out) }
    }

    unsafe fn secret_len_raw(&self, spec: Handle) -> StatusCode {
        unsafe { (self.fns().kem_secret_len)(spec) }
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

pub trait KdfService: NativeErrors {
    /// # Safety
    /// Every buffer must describe valid memory.
    unsafe fn pbkdf2_raw(
        &self,
        digest: &CStr,
        password: InBuf,
        salt: InBuf,
        iterations: i32,
        out: OutBuf,
    ) -> StatusCode;
    /// # Safety
    /// Every buffer must describe valid memory.
    unsafe fn hkdf_raw(
        &self,
        digest: &CStr,
        ikm: InBuf,
        salt: InBuf,
        info: InBuf,
        out: OutBuf,
    ) -> StatusCode;
    /// # Safety
    /// Every buffer must describe valid memory.
    unsafe fn scrypt_raw(
        &self,
        password: InBuf,
        salt: InBuf,
        n: i32,
        r: i32,
        p: i32,
        out: OutBuf,
    ) -> StatusCode;

    /// Fill `out` with PBKDF2-HMAC-`digest` output.
    fn pbkdf2(
        &self,
        digest: &str,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        out: &mut [u8],
    ) -> Result<usize> {
        let name = c_name(digest)?;
        let iterations = to_i32(iterations as usize, ErrorCode::InputTooLongInt32, "iterations")?;
        let (password, salt, out) = (whole(password)?, whole(salt)?, out_buf(out)?);
        // SAFETY: every buffer borrows a caller slice.
        let status = unsafe { self.pbkdf2_raw(&name, password, salt, iterations, out) };
        self.check(status)
            .map_err(|e| e.with_context(format!("PBKDF2 \"{digest}\"")))
    }

    /// Fill `out` with HKDF-`digest` output. An empty salt is allowed.
    fn hkdf(
        &self,
        digest: &str,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        let name = c_name(digest)?;
        let (ikm, salt, info, out) = (whole(ikm)?, whole(salt)?, whole(info)?, out_buf(out)?);
        // SAFETY: every buffer borrows a caller slice.
        let status = unsafe { self.hkdf_raw(&name, ikm, salt, info, out) };
        self.check(status)
            .map_err(|e| e.with_context(format!("HKDF \"{digest}\"")))
    }

    /// Fill `out` with scrypt output for cost `n`, block size `r` and
    /// parallelism `p`.
    fn scrypt(
        &self,
        password: &[u8],
        salt: &[u8],
        n: u32,
        r: u32,
        p: u32,
        out: &mut [u8],
    ) -> Result<usize> {
        let n = to_i32(n as usize, ErrorCode::InputTooLongInt32, "scrypt N")?;
        let r = to_i32(r as usize, ErrorCode::InputTooLongInt32, "scrypt r")?;
        let p = to_i32(p as usize, ErrorCode::InputTooLongInt32, "scrypt p")?;
        let (password, salt, out) = (whole(password)?, whole(salt)?, out_buf(out)?);
        // SAFETY: every buffer borrows a caller slice.
        let status = unsafe { self.scrypt_raw(password, salt, n, r, p, out) };
        self.check(status)
            .map_err(|e| e.with_context(format!("scrypt N={n} r={r} p={p}")))
    }
}

impl<T: NativeTable> KdfService for T {
    unsafe fn pbkdf2_raw(
        &self,
        digest: &CStr,
        password: InBuf,
        salt: InBuf,
        iterations: i32,
        out: OutBuf,
    ) -> StatusCode {
        unsafe { (self.fns().kdf_pbkdf2)(digest.as_ptr(), password, salt, iterations, out) }
    }

    unsafe fn hkdf_raw(
        &self,
        digest: &CStr,
        ikm: InBuf,
        salt: InBuf,
        info: InBuf,
        out: OutBuf,
    ) -> StatusCode {
        unsafe { (self.fns().kdf_hkdf)(digest.as_ptr(), ikm, salt, info, out) }
    }

    unsafe fn scrypt_raw(
        &self,
        password: InBuf,
        salt: InBuf,
        n: i32,
        r: i32,
        p: i32,
        out: OutBuf,
    ) -> StatusCode {
        unsafe { (self.fns().kdf_scrypt)(password, salt, n, r, p, out) }
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

pub trait SignatureService: NativeErrors {
    fn allocate_raw(&self, out: &mut Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live signature handle and `spec` a live key spec
    /// handle.
    unsafe fn init_sign_raw(&self, handle: Handle, spec: Handle) -> StatusCode;
    /// # Safety
    /// As for `init_sign_raw`.
    unsafe fn init_verify_raw(&self, handle: Handle, spec: Handle) -> StatusCode;
    /// # Safety
    /// `handle` must be a live signature handle and `input` readable.
    unsafe fn update_raw(&self, handle: Handle, input: InBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live signature handle and `out` null or writable.
    unsafe fn sign_raw(&self, handle: Handle, out: OutBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live signature handle and `sig` readable.
    unsafe fn verify_raw(&self, handle: Handle, sig: InBuf) -> StatusCode;
    /// # Safety
    /// `handle` must be a live signature handle; it is dangling afterwards.
    unsafe fn dispose(&self, handle: Handle);

    #[instrument(level = "debug", skip(self))]
    fn allocate(&self) -> Result<NativeHandle> {
        let mut raw: Handle = 0;
        let status = self.allocate_raw(&mut raw);
        self.check(status)
            .map_err(|e| e.with_context("signature context allocation"))?;
        allocated(raw, "signature")
    }

    /// # Safety
    /// `handle` must be a live signature handle and `spec` a live key spec
    /// handle.
    unsafe fn init_sign(&self, handle: Handle, spec: Handle) -> Result<()> {
        // SAFETY: forwarded.
        let status = unsafe { self.init_sign_raw(handle, spec) };
        self.check(status).map(drop)
    }

    /// # Safety
    /// As for `init_sign`.
    unsafe fn init_verify(&self, handle: Handle, spec: Handle) -> Result<()> {
        // SAFETY: forwarded.
        let status = unsafe { self.init_verify_raw(handle, spec) };
        self.check(status).map(drop)
    }

    /// # Safety
    /// `handle` must be a live signature handle.
    unsafe fn update(&self, handle: Handle, data: &[u8], offset: usize, len: usize) -> Result<()> {
        let input = in_buf(data, offset, len)?;
        // SAFETY: `input` borrows `data`; handle contract forwarded.
        let status = unsafe { self.update_raw(handle, input) };
        self.check(status).map(drop)
    }

    /// # Safety
    /// `handle` must be a live signature handle.
    unsafe fn signature_len(&self, handle: Handle) -> Result<usize> {
        // SAFETY: a null output is a length query.
        let status = unsafe { self.sign_raw(handle, OutBuf::null()) };
        self.check(status)
    }

    /// # Safety
    /// `handle` must be a live signature handle.
    unsafe fn sign(&self, handle: Handle, out: &mut [u8]) -> Result<usize> {
        let out = out_buf(out)?;
        // SAFETY: `out` borrows the caller's slice; handle contract forwarded.
        let status = unsafe { self.sign_raw(handle, out) };
        self.check(status)
    }

    /// # Safety
    /// `handle` must be a live signature handle.
    unsafe fn verify(&self, handle: Handle, sig: &[u8]) -> Result<bool> {
        let sig = whole(sig)?;
        // SAFETY: `sig` borrows the caller's slice; handle contract forwarded.
        let status = unsafe { self.verify_raw(handle, sig) };
        match self.check(status)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TetherError::ContractViolation(format!(
                "verify returned {other}, expected 0 or 1"
            ))),
        }
    }
}

impl<T: NativeTable> SignatureService for T {
    fn allocate_raw(&self, out: &mut Handle) -> StatusCode {
        // SAFETY: `out` is a valid handle slot.
        unsafe { (self.fns().sig_allocate)(out) }
    }

    unsafe fn init_sign_raw(&self, handle: Handle, spec: Handle) -> StatusCode {
        unsafe { (self.fns().sig_init_sign)(handle, spec) }
    }

    unsafe fn init_verify_raw(&self, handle: Handle, spec: Handle) -> StatusCode {
        unsafe { (self.fns().sig_init_verify)(handle, spec) }
    }

    unsafe fn update_raw(&self, handle: Handle, input: InBuf) -> StatusCode {
        unsafe { (self.fns().sig_update)(handle, input) }
    }

    unsafe fn sign_raw(&self, handle: Handle, out: OutBuf) -> StatusCode {
        unsafe { (self.fns().sig_sign)(handle, out) }
    }

    unsafe fn verify_raw(&self, handle: Handle, sig: InBuf) -> StatusCode {
        unsafe { (self.fns().sig_verify)(handle, sig) }
    }

    unsafe fn dispose(&self, handle: Handle) {
        unsafe { (self.fns().sig_dispose)(handle) }
    }
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

pub trait OpsTestService: NativeErrors {
    /// Whether the native library was built with fault injection.
    fn available(&self) -> bool;
    fn set_raw(&self, flag: i32, on: i32) -> StatusCode;
    /// Clear every flag for the calling thread.
    fn reset(&self);

    /// Set or clear `flag` for the calling thread.
    fn set(&self, flag: OpsFlag, on: bool) -> Result<()> {
        if !self.available() {
            return Err(TetherError::BackendUnavailable(
                "native library built without fault injection".into(),
            ));
        }
        let status = self.set_raw(flag.index(), i32::from(on));
        self.check(status).map(drop)
    }
}

impl<T: NativeTable> OpsTestService for T {
    fn available(&self) -> bool {
        // SAFETY: takes no arguments.
        unsafe { (self.fns().ops_available)() != 0 }
    }

    fn set_raw(&self, flag: i32, on: i32) -> StatusCode {
        // SAFETY: plain integers, range-checked natively.
        unsafe { (self.fns().ops_set)(flag, on) }
    }

    fn reset(&self) {
        // SAFETY: takes no arguments.
        unsafe { (self.fns().ops_reset)() }
    }
}

#[cfg(test)]
mod tests {
    use tether_core::{ErrorClass, FailureKind};

    use super::*;
    use crate::dispatch::DISPATCH;

    fn digest() -> &'static dyn DigestService {
        &DISPATCH
    }

    #[test]
    fn oversized_length_rejected_locally() {
        let err = to_i32(i32::MAX as usize + 1, ErrorCode::InputTooLongInt32, "input length")
            .unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::SizeOverflow));
        assert!(err.to_string().contains("input length"));
        assert_eq!(to_i32(7, ErrorCode::InputTooLongInt32, "x").unwrap(), 7);
    }

    #[test]
    fn unknown_digest_cites_name() {
        let err = digest().allocate("SHA-999", 0).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::NameNotFound));
        assert_eq!(err.class(), ErrorClass::InputValidation);
        assert!(err.to_string().contains("SHA-999"), "{err}");
    }

    #[test]
    fn nul_in_name_is_invalid_argument() {
        let err = digest().allocate("SHA\0256", 0).unwrap_err();
        assert!(matches!(err, TetherError::InvalidArgument(_)));
    }

    #[test]
    fn wrapped_error_carries_native_text() {
        let err = digest().allocate("SHA-256", 64).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::WrappedNativeError));
        assert!(err.to_string().contains("not an XOF"), "{err}");
        // The queue was drained by the failure above.
        assert!(DISPATCH.drain_diagnostics().is_empty());
    }

    #[test]
    fn range_checks_happen_natively() {
        let service = digest();
        let handle = service.allocate("SHA-256", 0).unwrap();
        let data = [0u8; 4];
        let err = unsafe { service.update(handle.as_raw(), &data, 2, 4) }.unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::OutOfRange));
        unsafe { service.dispose(handle.as_raw()) };
    }
}
