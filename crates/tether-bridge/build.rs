// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test and bench binaries bind the native entry points from their own image,
// so ELF targets must put the exported symbols in the dynamic symbol table.
// Mach-O executables export them already.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let family = std::env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if family.split(',').any(|f| f == "unix") && !matches!(os.as_str(), "macos" | "ios") {
        // Applies to every linked target of this package, unit tests included.
        println!("cargo:rustc-link-arg=-rdynamic");
    }
}
