// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key derivation. Stateless, so there is no handle to own.

use tether_core::Result;
use zeroize::Zeroizing;

use crate::context::Context;

/// PBKDF2 with HMAC over `digest` (SHA-1, SHA-256, SHA-384 or SHA-512),
/// producing `len` bytes.
pub fn pbkdf2(
    ctx: &Context,
    digest: &str,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    let written = ctx
        .services()
        .kdf
        .pbkdf2(digest, password, salt, iterations, &mut out)?;
    out.truncate(written);
    Ok(out)
}

/// HKDF extract-and-expand over `digest` (SHA-256, SHA-384 or SHA-512),
/// producing `len` bytes.
pub fn hkdf(
    ctx: &Context,
    digest: &str,
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    let written = ctx.services().kdf.hkdf(digest, ikm, salt, info, &mut out)?;
    out.truncate(written);
    Ok(out)
}

/// scrypt with cost `n` (a power of two, at least 2), block size `r` and
/// parallelism `p`, producing `len` bytes.
pub fn scrypt(
    ctx: &Context,
    password: &[u8],
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    let written = ctx
        .services()
        .kdf
        .scrypt(password, salt, n, r, p, &mut out)?;
    out.truncate(written);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use tether_core::FailureKind;

    use super::*;
    use crate::test_support::context;

    #[test]
    fn pbkdf2_sha256_vector() {
        let ctx = context();
        let key = pbkdf2(&ctx, "SHA-256", b"password", b"salt", 2, 32).unwrap();
        assert_eq!(
            hex::encode(&*key),
            "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43"
        );
    }

    #[test]
    fn hkdf_sha256_without_salt() {
        // RFC 5869 test case 3.
        let ctx = context();
        let okm = hkdf(&ctx, "SHA-256", &[0x0b; 22], b"", b"", 42).unwrap();
        assert_eq!(
            hex::encode(&*okm),
            "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d9d201395faa4b61a96c8"
        );
    }

    #[test]
    fn argument_failures() {
        let ctx = context();
        let err = pbkdf2(&ctx, "SHA-256", b"pw", b"salt", 0, 16).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));

        let err = hkdf(&ctx, "MD5", b"ikm", b"", b"", 16).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::NameNotFound));
        assert!(err.to_string().contains("MD5"), "{err}");

        let err = hkdf(&ctx, "SHA-256", b"ikm", b"", b"", 255 * 32 + 1).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::OutOfRange));
    }

    #[test]
    fn scrypt_rfc7914_vector() {
        let ctx = context();
        let key = scrypt(&ctx, b"pleaseletmein", b"SodiumChloride", 16384, 8, 1, 64).unwrap();
        assert_eq!(
            hex::encode(&*key),
            "7023bdcb3afd7348461c06cd81fd38ebfda8fbba904f8e3ea9b543f6545da1f2\
             d5432955613f0fcf62d49705242a9af9e61e85dc0d651e40dfcf017b45575887"
        );
    }

    #[test]
    fn scrypt_cost_failures() {
        let ctx = context();
        let err = scrypt(&ctx, b"pw", b"salt", 1000, 8, 1, 16).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));
        assert!(err.to_string().contains("power of two"), "{err}");

        let err = scrypt(&ctx, b"pw", b"salt", 16, 0, 1, 16).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));

        let err = scrypt(&ctx, b"pw", b"salt", 1 << 31, 8, 1, 16).unwrap_err();
        assert!(err.to_string().contains("scrypt N"), "{err}");

        let err = scrypt(&ctx, b"pw", b"", 16, 1, 1, 16).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidArgument));
    }
}
