// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for owner registration and release in the
// tether-disposal crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tether_core::{NativeHandle, TetherConfig};
use tether_disposal::{DisposeAction, HandleOwner, Registry};

static NEXT: AtomicUsize = AtomicUsize::new(1);

fn next_handle() -> NativeHandle {
    // Never zero, never repeated while the previous owner is live.
    NativeHandle::from_raw(NEXT.fetch_add(1, Ordering::Relaxed)).unwrap_or_else(|| next_handle())
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A single uncontended `DisposeAction::run`.
fn bench_action_run(c: &mut Criterion) {
    c.bench_function("dispose_action_run", |b| {
        b.iter(|| {
            let action = DisposeAction::new(next_handle(), |h| {
                black_box(h.as_raw());
            });
            black_box(action.run());
        });
    });
}

/// Register an owner and dispose it explicitly on the same thread.
fn bench_register_dispose(c: &mut Criterion) {
    let registry = Registry::new(&TetherConfig::default()).expect("registry");
    c.bench_function("register_then_dispose", |b| {
        b.iter(|| {
            let owner = HandleOwner::register_in(&registry, next_handle(), "Bench", |h| {
                black_box(h.as_raw());
            })
            .expect("register");
            owner.dispose();
        });
    });
}

/// Register an owner and drop it, then wait for the daemon to reclaim it.
fn bench_register_drop(c: &mut Criterion) {
    let registry = Registry::new(&TetherConfig::default()).expect("registry");
    c.bench_function("register_drop_flush (64 owners)", |b| {
        b.iter(|| {
            for _ in 0..64 {
                let owner = HandleOwner::register_in(&registry, next_handle(), "Bench", |h| {
                    black_box(h.as_raw());
                })
                .expect("register");
                drop(owner);
            }
            registry.flush();
        });
    });
}

criterion_group!(
    benches,
    bench_action_run,
    bench_register_dispose,
    bench_register_drop
);
criterion_main!(benches);
