// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks comparing the dispatch and dynamic backends on the
// same digest workload.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use tether_bridge::{DynamicBackend, Services};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Allocate, hash 4 KiB with SHA-256, finalize and dispose, per backend.
fn bench_sha256_per_backend(c: &mut Criterion) {
    let data = vec![0xA5u8; 4096];
    let backends = [
        ("dispatch", Services::dispatch()),
        (
            "dynamic",
            Services::from_backend(DynamicBackend::shared().expect("dynamic probe")),
        ),
    ];

    let mut group = c.benchmark_group("sha256_4k");
    for (name, services) in backends {
        group.bench_with_input(BenchmarkId::from_parameter(name), &services, |b, s| {
            let mut out = [0u8; 32];
            b.iter(|| {
                let handle = s.digest.allocate("SHA-256", 0).expect("allocate");
                let raw = handle.as_raw();
                // SAFETY: `raw` is live until the dispose below.
                unsafe {
                    s.digest
                        .update(raw, black_box(&data), 0, data.len())
                        .expect("update");
                    s.digest.finalize(raw, &mut out).expect("finalize");
                    s.digest.dispose(raw);
                }
                black_box(out);
            });
        });
    }
    group.finish();
}

/// Status translation on the hot path: a call that fails natively.
fn bench_failed_allocation(c: &mut Criterion) {
    let services = Services::dispatch();
    c.bench_function("digest_allocate_unknown_name", |b| {
        b.iter(|| black_box(services.digest.allocate(black_box("SHA-999"), 0).is_err()));
    });
}

criterion_group!(benches, bench_sha256_per_backend, bench_failed_allocation);
criterion_main!(benches);
