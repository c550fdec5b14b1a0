// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dynamically resolved backend.
//
// Every entry point is looked up by symbol name at runtime, either in the
// shared library named by the configuration or in the running process
// image. The probe only succeeds when all of them resolve and the library
// reports the interface version this crate was built against.

use std::ffi::{CStr, c_void};
use std::path::Path;
use std::sync::OnceLock;

use libloading::Library;
use tether_core::{BackendKind, Result, TetherConfig, TetherError};
use tether_native::abi::InterfaceVersionFn;
use tether_native::{INTERFACE_VERSION, NativeFns};
use tracing::debug;

use crate::traits::NativeTable;

/// Backend over a table of symbols resolved by name.
#[derive(Debug)]
pub struct DynamicBackend {
    fns: NativeFns,
    version: u32,
    source: String,
    // Keeps the resolved addresses valid.
    _library: Option<Library>,
}

static SHARED: OnceLock<DynamicBackend> = OnceLock::new();

fn unavailable(detail: impl Into<String>) -> TetherError {
    TetherError::BackendUnavailable(detail.into())
}

fn resolve(lookup: &dyn Fn(&CStr) -> *const c_void, name: &CStr) -> Result<*const c_void> {
    let address = lookup(name);
    if address.is_null() {
        return Err(unavailable(format!(
            "symbol {} did not resolve",
            name.to_string_lossy()
        )));
    }
    Ok(address)
}

// Each symbol is transmuted to the type of the field it initialises.
macro_rules! bind {
    ($lookup:expr, $name:literal) => {{
        let address = resolve($lookup, $name)?;
        // SAFETY: the library exports `$name` with the signature of the
        // `NativeFns` field being initialised.
        unsafe { std::mem::transmute::<*const c_void, _>(address) }
    }};
}

/// Address of `name` in `library`, or null if it is not exported.
pub(crate) fn symbol_address(library: &Library, name: &CStr) -> *const c_void {
    // SAFETY: the address is only read out here; callers give it a type.
    match unsafe { library.get::<*const c_void>(name.to_bytes_with_nul()) } {
        Ok(symbol) => *symbol,
        Err(_) => std::ptr::null(),
    }
}

#[cfg(unix)]
pub(crate) fn process_image() -> Result<Library> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
pub(crate) fn process_image() -> Result<Library> {
    libloading::os::windows::Library::this()
        .map(Into::into)
        .map_err(|e| unavailable(format!("process image: {e}")))
}

#[cfg(not(any(unix, windows)))]
pub(crate) fn process_image() -> Result<Library> {
    Err(unavailable("no dynamic loader on this platform"))
}

impl DynamicBackend {
    /// Resolve from the configured library, or the process image when none
    /// is configured.
    pub fn probe() -> Result<Self> {
        match &TetherConfig::global().native_library {
            Some(path) => Self::open(path),
            None => Self::from_process(),
        }
    }

    /// Resolve from the symbols the running process exports.
    pub fn from_process() -> Result<Self> {
        Self::from_library(process_image()?, "process image".into())
    }

    /// Load the shared library at `path` and resolve from it.
    pub fn open(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initialisers; the configured
        // path is trusted to name a tether native library.
        let library = unsafe { Library::new(path) }
            .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
        Self::from_library(library, path.display().to_string())
    }

    fn from_library(library: Library, source: String) -> Result<Self> {
        let backend = Self::probe_with(|name| symbol_address(&library, name))
            .map_err(|e| e.with_context(&source))?;
        debug!(%source, "native library bound");
        Ok(Self {
            source,
            _library: Some(library),
            ..backend
        })
    }

    /// Resolve every entry point through `lookup`, which returns null for
    /// unknown names. The caller keeps the addresses valid.
    pub fn probe_with(lookup: impl Fn(&CStr) -> *const c_void) -> Result<Self> {
        let lookup: &dyn Fn(&CStr) -> *const c_void = &lookup;

        let interface_version: InterfaceVersionFn = bind!(lookup, c"tether_interface_version");
        // SAFETY: takes no arguments.
        let version = unsafe { interface_version() };
        if version != INTERFACE_VERSION {
            return Err(unavailable(format!(
                "native interface version {version}, expected {INTERFACE_VERSION}"
            )));
        }

        let fns = NativeFns {
            interface_version,

            md_allocate: bind!(lookup, c"tether_md_allocate"),
            md_update_byte: bind!(lookup, c"tether_md_update_byte"),
            md_update: bind!(lookup, c"tether_md_update"),
            md_output_len: bind!(lookup, c"tether_md_output_len"),
            md_finalize: bind!(lookup, c"tether_md_finalize"),
            md_reset: bind!(lookup, c"tether_md_reset"),
            md_dispose: bind!(lookup, c"tether_md_dispose"),

            spec_allocate: bind!(lookup, c"tether_spec_allocate"),
            spec_dispose: bind!(lookup, c"tether_spec_dispose"),
            spec_generate: bind!(lookup, c"tether_spec_generate"),
            spec_decode_public: bind!(lookup, c"tether_spec_decode_public"),
            spec_decode_private: bind!(lookup, c"tether_spec_decode_private"),
            spec_encode_public: bind!(lookup, c"tether_spec_encode_public"),
            spec_encode_private: bind!(lookup, c"tether_spec_encode_private"),
            spec_key_type: bind!(lookup, c"tether_spec_key_type"),

            kem_encapsulate: bind!(lookup, c"tether_kem_encapsulate"),
            kem_decapsulate: bind!(lookup, c"tether_kem_decapsulate"),
            kem_secret_len: bind!(lookup, c"tether_kem_secret_len"),

            sig_allocate: bind!(lookup, c"tether_sig_allocate"),
            sig_dispose: bind!(lookup, c"tether_sig_dispose"),
            sig_init_sign: bind!(lookup, c"tether_sig_init_sign"),
            sig_init_verify: bind!(lookup, c"tether_sig_init_verify"),
            sig_update: bind!(lookup, c"tether_sig_update"),
            sig_sign: bind!(lookup, c"tether_sig_sign"),
            sig_verify: bind!(lookup, c"tether_sig_verify"),

            kdf_pbkdf2: bind!(lookup, c"tether_kdf_pbkdf2"),
            kdf_hkdf: bind!(lookup, c"tether_kdf_hkdf"),
            kdf_scrypt: bind!(lookup, c"tether_kdf_scrypt"),

            ops_available: bind!(lookup, c"tether_ops_available"),
            ops_set: bind!(lookup, c"tether_ops_set"),
            ops_reset: bind!(lookup, c"tether_ops_reset"),

            errors_drain: bind!(lookup, c"tether_errors_drain"),
        };

        debug!(version, "native symbols resolved");
        Ok(Self {
            fns,
            version,
            source: "custom lookup".into(),
            _library: None,
        })
    }

    /// The process-wide dynamic backend, probed on first successful use.
    /// A failed probe is retried by the next caller.
    pub fn shared() -> Result<&'static DynamicBackend> {
        if let Some(backend) = SHARED.get() {
            return Ok(backend);
        }
        let backend = Self::probe()?;
        Ok(SHARED.get_or_init(|| backend))
    }

    /// Interface version reported by the resolved library.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Where the symbols came from: a library path or the process image.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl NativeTable for DynamicBackend {
    fn fns(&self) -> &NativeFns {
        &self.fns
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Dynamic
    }
}
