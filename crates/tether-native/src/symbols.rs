// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The exported surface. Every entry point is `#[unsafe(no_mangle)]`, so a
// caller can bind it by name from this crate's cdylib or from any image that
// links it and exports its dynamic symbols.

/// Bumped whenever an entry point signature or status code changes.
pub const INTERFACE_VERSION: u32 = 4;

#[unsafe(no_mangle)]
pub extern "C" fn tether_interface_version() -> u32 {
    INTERFACE_VERSION
}

/// Names of every exported entry point, in `NativeFns` field order.
pub const SYMBOLS: &[&str] = &[
    "tether_interface_version",
    "tether_md_allocate",
    "tether_md_update_byte",
    "tether_md_update",
    "tether_md_output_len",
    "tether_md_finalize",
    "tether_md_reset",
    "tether_md_dispose",
    "tether_spec_allocate",
    "tether_spec_dispose",
    "tether_spec_generate",
    "tether_spec_decode_public",
    "tether_spec_decode_private",
    "tether_spec_encode_public",
    "tether_spec_encode_private",
    "tether_spec_key_type",
    "tether_kem_encapsulate",
    "tether_kem_decapsulate",
    "tether_kem_secret_len",
    "tether_sig_allocate",
    "tether_sig_dispose",
    "tether_sig_init_sign",
    "tether_sig_init_verify",
    "tether_sig_update",
    "tether_sig_sign",
    "tether_sig_verify",
    "tether_kdf_pbkdf2",
    "tether_kdf_hkdf",
    "tether_kdf_scrypt",
    "tether_ops_available",
    "tether_ops_set",
    "tether_ops_reset",
    "tether_errors_drain",
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn version_query() {
        assert_eq!(tether_interface_version(), INTERFACE_VERSION);
        assert_eq!(SYMBOLS[0], "tether_interface_version");
    }

    #[test]
    fn symbol_names_are_unique_and_prefixed() {
        let unique: HashSet<_> = SYMBOLS.iter().collect();
        assert_eq!(unique.len(), SYMBOLS.len());
        assert!(SYMBOLS.iter().all(|s| s.starts_with("tether_")));
        // One per `NativeFns` field.
        let fields = std::mem::size_of::<crate::NativeFns>() / std::mem::size_of::<usize>();
        assert_eq!(SYMBOLS.len(), fields);
    }
}
