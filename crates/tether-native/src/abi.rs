// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ABI types shared by every entry point: handles, buffer triples, the entry
// point signatures and the function table that carries them.

use std::ffi::{CStr, c_char};
use std::panic::{self, AssertUnwindSafe};

use crate::codes::Code;
use crate::errors;
use crate::ops::{self, Flag};

/// Raw handle to a boxed native context. Zero is never a valid handle.
pub type Handle = usize;

// ---------------------------------------------------------------------------
// Buffer triples
// ---------------------------------------------------------------------------

/// Read-only (buffer, offset, length) triple. `size` is the total length of
/// the allocation behind `data`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InBuf {
    pub data: *const u8,
    pub size: usize,
    pub offset: i32,
    pub len: i32,
}

impl InBuf {
    pub fn new(data: &[u8], offset: i32, len: i32) -> Self {
        Self {
            data: data.as_ptr(),
            size: data.len(),
            offset,
            len,
        }
    }

    #[cfg(test)]
    pub(crate) fn whole(data: &[u8]) -> Self {
        let len = i32::try_from(data.len()).expect("test buffer fits in i32");
        Self::new(data, 0, len)
    }

    pub const fn null() -> Self {
        Self {
            data: std::ptr::null(),
            size: 0,
            offset: 0,
            len: 0,
        }
    }

    /// Validate the triple and borrow the addressed bytes.
    ///
    /// Checks run in a fixed order: null, negative offset, negative length,
    /// range, access.
    ///
    /// # Safety
    ///
    /// `data` must be null or valid for reads of `size` bytes for `'a`.
    pub(crate) unsafe fn slice<'a>(&self, checks: &InChecks) -> Result<&'a [u8], Code> {
        if self.data.is_null() {
            return Err(checks.null);
        }
        if self.offset < 0 {
            return Err(Code::InputOffsetNegative);
        }
        if self.len < 0 {
            return Err(Code::InputLenNegative);
        }
        let (offset, len) = (self.offset as usize, self.len as usize);
        if offset.checked_add(len).is_none_or(|end| end > self.size) {
            return Err(checks.out_of_range);
        }
        if ops::is_set(checks.access_flag) {
            return Err(checks.access);
        }
        // SAFETY: range checked against `size` above.
        Ok(unsafe { std::slice::from_raw_parts(self.data.add(offset), len) })
    }
}

/// Status codes reported by `InBuf::slice` for a given argument role.
pub(crate) struct InChecks {
    null: Code,
    out_of_range: Code,
    access: Code,
    access_flag: Flag,
}

pub(crate) const INPUT: InChecks = InChecks {
    null: Code::InputIsNull,
    out_of_range: Code::InputOutOfRange,
    access: Code::FailedAccessInput,
    access_flag: Flag::FailedAccess1,
};

pub(crate) const SIGNATURE: InChecks = InChecks {
    null: Code::SigIsNull,
    out_of_range: Code::SigOutOfRange,
    access: Code::FailedAccessSig,
    access_flag: Flag::FailedAccess4,
};

/// Writable (buffer, offset, length) triple. A null `data` asks the entry
/// point for the length it would write.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OutBuf {
    pub data: *mut u8,
    pub size: usize,
    pub offset: i32,
    pub len: i32,
}

impl OutBuf {
    pub fn new(data: &mut [u8], offset: i32, len: i32) -> Self {
        Self {
            data: data.as_mut_ptr(),
            size: data.len(),
            offset,
            len,
        }
    }

    pub const fn null() -> Self {
        Self {
            data: std::ptr::null_mut(),
            size: 0,
            offset: 0,
            len: 0,
        }
    }

    /// # Safety
    ///
    /// `data` must be non-null and valid for writes of `size` bytes for `'a`.
    unsafe fn checked<'a>(&self) -> Result<&'a mut [u8], Code> {
        if self.offset < 0 {
            return Err(Code::OutputOffsetNegative);
        }
        if self.len < 0 {
            return Err(Code::OutputLenNegative);
        }
        let (offset, len) = (self.offset as usize, self.len as usize);
        if offset.checked_add(len).is_none_or(|end| end > self.size) {
            return Err(Code::OutputOutOfRange);
        }
        if ops::is_set(Flag::FailedAccess2) {
            return Err(Code::FailedAccessOutput);
        }
        // SAFETY: see function contract; range checked above.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.data.add(offset), len) })
    }

    /// Borrow exactly `needed` bytes of the window, or `None` for a length
    /// query.
    ///
    /// # Safety
    ///
    /// `data` must be null or valid for writes of `size` bytes for `'a`.
    pub(crate) unsafe fn sized<'a>(&self, needed: usize) -> Result<Option<&'a mut [u8]>, Code> {
        if self.data.is_null() {
            return Ok(None);
        }
        // SAFETY: non-null here, remaining contract forwarded.
        let window = unsafe { self.checked() }?;
        if window.len() < needed {
            return Err(Code::OutputTooSmall);
        }
        Ok(Some(&mut window[..needed]))
    }

    /// Borrow the whole window. Null is an error here because the caller
    /// chooses the output length.
    ///
    /// # Safety
    ///
    /// As for `sized`.
    pub(crate) unsafe fn window<'a>(&self) -> Result<&'a mut [u8], Code> {
        if self.data.is_null() {
            return Err(Code::OutputIsNull);
        }
        // SAFETY: non-null here, remaining contract forwarded.
        unsafe { self.checked() }
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by entry points
// ---------------------------------------------------------------------------

/// Run an entry point body, mapping `Err(code)` to its raw value and any
/// panic to `Code::Fail`.
pub(crate) fn guard(body: impl FnOnce() -> Result<i32, Code>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(code)) => code.raw(),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            errors::push(format!("panic in native call: {message}"));
            Code::Fail.raw()
        }
    }
}

pub(crate) fn into_handle<T>(value: T) -> Handle {
    Box::into_raw(Box::new(value)) as Handle
}

/// # Safety
///
/// `handle` must be zero or a live handle created by `into_handle::<T>`, not
/// aliased for `'a`.
pub(crate) unsafe fn context<'a, T>(handle: Handle) -> Result<&'a mut T, Code> {
    if handle == 0 {
        return Err(Code::InvalidHandle);
    }
    // SAFETY: see function contract.
    Ok(unsafe { &mut *(handle as *mut T) })
}

/// # Safety
///
/// `handle` must be zero or a live handle created by `into_handle::<T>`. It
/// is dangling afterwards.
pub(crate) unsafe fn release<T>(handle: Handle) {
    if handle != 0 {
        // SAFETY: see function contract.
        drop(unsafe { Box::from_raw(handle as *mut T) });
    }
}

/// # Safety
///
/// `out` must be null or valid for a `Handle` write.
pub(crate) unsafe fn store_handle(out: *mut Handle, handle: Handle) {
    // SAFETY: null-checked by every caller before any work is done.
    unsafe { *out = handle };
}

/// Read a NUL-terminated name argument.
///
/// # Safety
///
/// `name` must be null or point at a NUL-terminated string.
pub(crate) unsafe fn read_name<'a>(name: *const c_char) -> Result<&'a str, Code> {
    if name.is_null() {
        return Err(Code::NameIsNull);
    }
    if ops::is_set(Flag::FailedAccess3) {
        return Err(Code::NameAccessFailed);
    }
    // SAFETY: see function contract.
    unsafe { CStr::from_ptr(name) }
        .to_str()
        .map_err(|_| Code::NameNotFound)
}

// ---------------------------------------------------------------------------
// Entry point signatures and the function table
// ---------------------------------------------------------------------------

pub type MdAllocateFn = unsafe extern "C" fn(*const c_char, i32, *mut Handle) -> i32;
pub type MdUpdateByteFn = unsafe extern "C" fn(Handle, u8) -> i32;
pub type MdUpdateFn = unsafe extern "C" fn(Handle, InBuf) -> i32;
pub type MdOutputLenFn = unsafe extern "C" fn(Handle) -> i32;
pub type MdFinalizeFn = unsafe extern "C" fn(Handle, OutBuf) -> i32;
pub type MdResetFn = unsafe extern "C" fn(Handle) -> i32;

pub type AllocateFn = unsafe extern "C" fn(*mut Handle) -> i32;
pub type DisposeFn = unsafe extern "C" fn(Handle);

pub type SpecGenerateFn = unsafe extern "C" fn(Handle, i32) -> i32;
pub type SpecDecodeFn = unsafe extern "C" fn(Handle, i32, InBuf) -> i32;
pub type SpecEncodeFn = unsafe extern "C" fn(Handle, OutBuf) -> i32;
pub type SpecKeyTypeFn = unsafe extern "C" fn(Handle) -> i32;

pub type KemEncapsulateFn = unsafe extern "C" fn(Handle, OutBuf) -> i32;
pub type KemDecapsulateFn = unsafe extern "C" fn(Handle, InBuf, OutBuf) -> i32;
pub type KemSecretLenFn = unsafe extern "C" fn(Handle) -> i32;

pub type SigInitFn = unsafe extern "C" fn(Handle, Handle) -> i32;
pub type SigUpdateFn = unsafe extern "C" fn(Handle, InBuf) -> i32;
pub type SigSignFn = unsafe extern "C" fn(Handle, OutBuf) -> i32;
pub type SigVerifyFn = unsafe extern "C" fn(Handle, InBuf) -> i32;

pub type KdfPbkdf2Fn = unsafe extern "C" fn(*const c_char, InBuf, InBuf, i32, OutBuf) -> i32;
pub type KdfHkdfFn = unsafe extern "C" fn(*const c_char, InBuf, InBuf, InBuf, OutBuf) -> i32;
pub type KdfScryptFn = unsafe extern "C" fn(InBuf, InBuf, i32, i32, i32, OutBuf) -> i32;

pub type OpsAvailableFn = unsafe extern "C" fn() -> i32;
pub type OpsSetFn = unsafe extern "C" fn(i32, i32) -> i32;
pub type OpsResetFn = unsafe extern "C" fn();

pub type ErrorsDrainFn = unsafe extern "C" fn(*mut u8, usize) -> i32;

pub type InterfaceVersionFn = unsafe extern "C" fn() -> u32;

/// Every entry point of the library.
#[derive(Debug, Clone, Copy)]
pub struct NativeFns {
    pub interface_version: InterfaceVersionFn,

    pub md_allocate: MdAllocateFn,
    pub md_update_byte: MdUpdateByteFn,
    pub md_update: MdUpdateFn,
    pub md_output_len: MdOutputLenFn,
    pub md_finalize: MdFinalizeFn,
    pub md_reset: MdResetFn,
    pub md_dispose: DisposeFn,

    pub spec_allocate: AllocateFn,
    pub spec_dispose: DisposeFn,
    pub spec_generate: SpecGenerateFn,
    pub spec_decode_public: SpecDecodeFn,
    pub spec_decode_private: SpecDecodeFn,
    pub spec_encode_public: SpecEncodeFn,
    pub spec_encode_private: SpecEncodeFn,
    pub spec_key_type: SpecKeyTypeFn,

    pub kem_encapsulate: KemEncapsulateFn,
    pub kem_decapsulate: KemDecapsulateFn,
    pub kem_secret_len: KemSecretLenFn,

    pub sig_allocate: AllocateFn,
    pub sig_dispose: DisposeFn,
    pub sig_init_sign: SigInitFn,
    pub sig_init_verify: SigInitFn,
    pub sig_update: SigUpdateFn,
    pub sig_sign: SigSignFn,
    pub sig_verify: SigVerifyFn,

    pub kdf_pbkdf2: KdfPbkdf2Fn,
    pub kdf_hkdf: KdfHkdfFn,
    pub kdf_scrypt: KdfScryptFn,

    pub ops_available: OpsAvailableFn,
    pub ops_set: OpsSetFn,
    pub ops_reset: OpsResetFn,

    pub errors_drain: ErrorsDrainFn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_checks_run_in_order() {
        let data = [1u8, 2, 3, 4];
        let slice = |b: InBuf| unsafe { b.slice(&INPUT) };

        assert_eq!(slice(InBuf::null()).unwrap_err(), Code::InputIsNull);
        assert_eq!(slice(InBuf::new(&data, -1, -1)).unwrap_err(), Code::InputOffsetNegative);
        assert_eq!(slice(InBuf::new(&data, 0, -1)).unwrap_err(), Code::InputLenNegative);
        assert_eq!(slice(InBuf::new(&data, 3, 2)).unwrap_err(), Code::InputOutOfRange);
        assert_eq!(slice(InBuf::new(&data, 1, 2)).unwrap(), &[2, 3]);
        assert_eq!(slice(InBuf::new(&data, 4, 0)).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn signature_role_reports_signature_codes() {
        let data = [0u8; 8];
        let err = unsafe { InBuf::null().slice(&SIGNATURE) }.unwrap_err();
        assert_eq!(err, Code::SigIsNull);
        let err = unsafe { InBuf::new(&data, 4, 8).slice(&SIGNATURE) }.unwrap_err();
        assert_eq!(err, Code::SigOutOfRange);
    }

    #[test]
    fn output_length_query_and_bounds() {
        let mut data = [0u8; 8];
        assert!(unsafe { OutBuf::null().sized(32) }.unwrap().is_none());

        let out = OutBuf::new(&mut data, 2, 4);
        assert_eq!(unsafe { out.sized(5) }.unwrap_err(), Code::OutputTooSmall);
        assert_eq!(unsafe { out.sized(4) }.unwrap().unwrap().len(), 4);

        let out = OutBuf::new(&mut data, 6, 4);
        assert_eq!(unsafe { out.sized(1) }.unwrap_err(), Code::OutputOutOfRange);
        assert_eq!(unsafe { OutBuf::null().window() }.unwrap_err(), Code::OutputIsNull);
    }

    #[test]
    fn guard_catches_panics() {
        let status = guard(|| panic!("boom"));
        assert_eq!(status, Code::Fail.raw());
        let mut buf = [0u8; 64];
        let n = unsafe { crate::errors::tether_errors_drain(buf.as_mut_ptr(), buf.len()) };
        let text = std::str::from_utf8(&buf[..n as usize]).unwrap();
        assert!(text.contains("boom"), "{text}");
    }
}
