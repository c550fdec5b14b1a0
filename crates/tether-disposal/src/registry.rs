// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reclamation registry.
//
// Every live `HandleOwner` has one entry in a slot table keyed by
// generation-checked `SlotKey`s. A key only ever resolves to the entry it
// was issued for: taking an entry bumps the slot's generation, so stale keys
// (a late notice for an owner that was already disposed) find nothing.
//
// Dropping an owner without disposing it posts an `Unreachable` notice to
// the registry's daemon thread, which runs the entry's `DisposeAction`.
// On a fixed interval, busy or not, the daemon also sweeps the table for
// entries whose owner is gone but never sent a notice. A panicking action is
// logged and counted; the daemon carries on.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tether_core::{Result, TetherConfig, TetherError};
use tracing::{debug, error, info, warn};

use crate::action::DisposeAction;

// ---------------------------------------------------------------------------
// Slot table
// ---------------------------------------------------------------------------

/// Generation-checked key of one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

struct Entry {
    action: Arc<DisposeAction>,
    label: String,
    liveness: Weak<()>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct SlotTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Raw values of every handle with a live entry.
    live: HashSet<usize>,
}

impl SlotTable {
    fn insert(&mut self, entry: Entry) -> Result<SlotKey> {
        let raw = entry.action.handle().as_raw();
        if !self.live.insert(raw) {
            return Err(TetherError::ContractViolation(format!(
                "handle {raw:#x} already has a live owner ({})",
                entry.label
            )));
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(entry);
        Ok(SlotKey {
            index,
            generation: slot.generation,
        })
    }

    fn take(&mut self, key: SlotKey) -> Option<Entry> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live.remove(&entry.action.handle().as_raw());
        Some(entry)
    }

    /// Keys of entries whose owner no longer exists.
    fn orphaned(&self) -> Vec<SlotKey> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let entry = slot.entry.as_ref()?;
                (entry.liveness.strong_count() == 0).then_some(SlotKey {
                    index: index as u32,
                    generation: slot.generation,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Shared state (registry + daemon)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Reclaim {
    Unreachable,
    Swept,
    Inline,
}

#[derive(Default)]
struct Counters {
    registered: AtomicU64,
    explicit: AtomicU64,
    reclaimed: AtomicU64,
    swept: AtomicU64,
    failed: AtomicU64,
}

#[derive(Default)]
struct Shared {
    table: Mutex<SlotTable>,
    counters: Counters,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, SlotTable> {
        // Actions never run under the lock, so a poisoned table is still
        // consistent.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reclaim(&self, key: SlotKey, how: Reclaim) {
        let entry = self.table().take(key);
        if let Some(entry) = entry {
            self.run(entry, how);
        }
    }

    fn sweep(&self) -> usize {
        let orphans: Vec<Entry> = {
            let mut table = self.table();
            let keys = table.orphaned();
            keys.into_iter().filter_map(|key| table.take(key)).collect()
        };
        let count = orphans.len();
        for entry in orphans {
            warn!(label = %entry.label, "owner reclaimed by sweep, no unreachable notice seen");
            self.run(entry, Reclaim::Swept);
        }
        count
    }

    fn run(&self, entry: Entry, how: Reclaim) {
        match panic::catch_unwind(AssertUnwindSafe(|| entry.action.run())) {
            Ok(true) => {
                let counter = match how {
                    Reclaim::Swept => &self.counters.swept,
                    Reclaim::Unreachable | Reclaim::Inline => &self.counters.reclaimed,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(label = %entry.label, ?how, "handle reclaimed");
            }
            Ok(false) => {
                debug!(label = %entry.label, "handle already released");
            }
            Err(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(label = %entry.label, ?how, "dispose action panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

enum Notice {
    Unreachable(SlotKey),
    Sweep(Sender<usize>),
    Flush(Sender<()>),
}

fn handle_notice(shared: &Shared, notice: Notice) {
    match notice {
        Notice::Unreachable(key) => shared.reclaim(key, Reclaim::Unreachable),
        Notice::Sweep(reply) => {
            let _ = reply.send(shared.sweep());
        }
        Notice::Flush(reply) => {
            let _ = reply.send(());
        }
    }
}

fn run_daemon(shared: Arc<Shared>, notices: Receiver<Notice>, interval: Duration) {
    info!(interval_ms = interval.as_millis() as u64, "reclamation daemon started");
    let mut next_sweep = Instant::now() + interval;
    loop {
        match notices.recv_timeout(next_sweep.saturating_duration_since(Instant::now())) {
            Ok(notice) => handle_notice(&shared, notice),
            Err(RecvTimeoutError::Timeout) => {
                while let Ok(notice) = notices.try_recv() {
                    handle_notice(&shared, notice);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        // The sweep is due on schedule even while notices keep arriving.
        if Instant::now() >= next_sweep {
            shared.sweep();
            next_sweep = Instant::now() + interval;
        }
    }
    let remaining = shared.sweep();
    info!(remaining, "reclamation daemon stopped");
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Point-in-time registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Entries currently registered.
    pub live: usize,
    /// Owners ever registered.
    pub registered: u64,
    /// Handles released by explicit disposal.
    pub explicit: u64,
    /// Handles released after their owner became unreachable.
    pub reclaimed: u64,
    /// Handles released by the periodic sweep.
    pub swept: u64,
    /// Dispose actions that panicked.
    pub failed: u64,
}

/// Tracks live owners and reclaims the unreachable ones.
pub struct Registry {
    shared: Arc<Shared>,
    notices: Option<Sender<Notice>>,
    daemon: Option<JoinHandle<()>>,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// Start a registry and its daemon thread.
    pub fn new(config: &TetherConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        let interval = config.sweep_interval();
        let daemon = thread::Builder::new()
            .name(config.daemon_thread_name.clone())
            .spawn(move || run_daemon(worker, rx, interval))?;

        Ok(Arc::new(Self {
            shared,
            notices: Some(tx),
            daemon: Some(daemon),
        }))
    }

    /// The process-wide registry, started on first use.
    pub fn global() -> Result<&'static Arc<Registry>> {
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }
        // A registry built by a thread that loses the race is dropped, which
        // stops its daemon.
        let registry = Registry::new(TetherConfig::global())?;
        Ok(GLOBAL.get_or_init(|| registry))
    }

    /// Track `action` until its owner disposes it or `liveness` dies.
    ///
    /// Fails with a contract violation if the handle already has a live
    /// entry; the action is then dropped without running.
    pub fn register(
        &self,
        action: Arc<DisposeAction>,
        label: impl Into<String>,
        liveness: &Arc<()>,
    ) -> Result<SlotKey> {
        let label = label.into();
        let entry = Entry {
            action,
            label: label.clone(),
            liveness: Arc::downgrade(liveness),
        };
        let key = self.shared.table().insert(entry)?;
        self.shared.counters.registered.fetch_add(1, Ordering::Relaxed);
        debug!(%label, "owner registered");
        Ok(key)
    }

    /// Remove the entry for `key` and release its handle on the calling
    /// thread. Returns `true` if this call performed the release.
    pub fn dispose_now(&self, key: SlotKey, action: &DisposeAction) -> bool {
        let entry = self.shared.table().take(key);
        let released = action.run();
        if released {
            self.shared.counters.explicit.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(entry) = entry {
            debug!(label = %entry.label, released, "owner disposed");
        }
        released
    }

    /// Hand `key` to the daemon for reclamation. Falls back to reclaiming
    /// on the calling thread if the daemon is gone.
    pub fn notify_unreachable(&self, key: SlotKey) {
        let sent = self
            .notices
            .as_ref()
            .is_some_and(|tx| tx.send(Notice::Unreachable(key)).is_ok());
        if !sent {
            warn!("reclamation daemon unavailable, reclaiming inline");
            self.shared.reclaim(key, Reclaim::Inline);
        }
    }

    /// Block until the daemon has processed every notice sent before this
    /// call.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        if let Some(notices) = &self.notices {
            if notices.send(Notice::Flush(tx)).is_ok() {
                let _ = rx.recv();
            }
        }
    }

    /// Run a sweep on the daemon now and return how many orphaned entries
    /// it reclaimed.
    pub fn sweep_now(&self) -> usize {
        let (tx, rx) = mpsc::channel();
        match &self.notices {
            Some(notices) if notices.send(Notice::Sweep(tx)).is_ok() => rx.recv().unwrap_or(0),
            _ => self.shared.sweep(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.shared.table().live.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.shared.counters;
        RegistryStats {
            live: self.live_count(),
            registered: c.registered.load(Ordering::Relaxed),
            explicit: c.explicit.load(Ordering::Relaxed),
            reclaimed: c.reclaimed.load(Ordering::Relaxed),
            swept: c.swept.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // Closing the channel stops the daemon after a final sweep.
        self.notices.take();
        if let Some(daemon) = self.daemon.take() {
            if daemon.thread().id() != thread::current().id() {
                let _ = daemon.join();
            }
        }
    }
}
