// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Precompiled dispatch table: every entry point bound at link time.

use crate::abi::NativeFns;
use crate::{errors, kdf, kem, md, ops, sig, spec, symbols};

pub static TABLE: NativeFns = NativeFns {
    interface_version: symbols::tether_interface_version,

    md_allocate: md::tether_md_allocate,
    md_update_byte: md::tether_md_update_byte,
    md_update: md::tether_md_update,
    md_output_len: md::tether_md_output_len,
    md_finalize: md::tether_md_finalize,
    md_reset: md::tether_md_reset,
    md_dispose: md::tether_md_dispose,

    spec_allocate: spec::tether_spec_allocate,
    spec_dispose: spec::tether_spec_dispose,
    spec_generate: spec::tether_spec_generate,
    spec_decode_public: spec::tether_spec_decode_public,
    spec_decode_private: spec::tether_spec_decode_private,
    spec_encode_public: spec::tether_spec_encode_public,
    spec_encode_private: spec::tether_spec_encode_private,
    spec_key_type: spec::tether_spec_key_type,

    kem_encapsulate: kem::tether_kem_encapsulate,
    kem_decapsulate: kem::tether_kem_decapsulate,
    kem_secret_len: kem::tether_kem_secret_len,

    sig_allocate: sig::tether_sig_allocate,
    sig_dispose: sig::tether_sig_dispose,
    sig_init_sign: sig::tether_sig_init_sign,
    sig_init_verify: sig::tether_sig_init_verify,
    sig_update: sig::tether_sig_update,
    sig_sign: sig::tether_sig_sign,
    sig_verify: sig::tether_sig_verify,

    kdf_pbkdf2: kdf::tether_kdf_pbkdf2,
    kdf_hkdf: kdf::tether_kdf_hkdf,
    kdf_scrypt: kdf::tether_kdf_scrypt,

    ops_available: ops::tether_ops_available,
    ops_set: ops::tether_ops_set,
    ops_reset: ops::tether_ops_reset,

    errors_drain: errors::tether_errors_drain,
};
