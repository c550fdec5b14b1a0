// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime configuration.
//
// Read once per process. A JSON file named by `TETHER_CONFIG` supplies the
// base values, then `TETHER_BACKEND`, `TETHER_SWEEP_INTERVAL_MS` and
// `TETHER_NATIVE_LIB` override individual fields.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TetherError};

pub const ENV_CONFIG_PATH: &str = "TETHER_CONFIG";
pub const ENV_BACKEND: &str = "TETHER_BACKEND";
pub const ENV_SWEEP_INTERVAL_MS: &str = "TETHER_SWEEP_INTERVAL_MS";
pub const ENV_NATIVE_LIB: &str = "TETHER_NATIVE_LIB";

/// Which invocation strategy the backend selector should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Probe dynamic symbol resolution, fall back to the dispatch table.
    Auto,
    /// Dynamic symbol resolution. Falls back (loudly) if the probe fails.
    Dynamic,
    /// Precompiled dispatch table.
    Dispatch,
}

impl FromStr for BackendPreference {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(BackendPreference::Auto),
            "dynamic" | "ffi" => Ok(BackendPreference::Dynamic),
            "dispatch" | "static" => Ok(BackendPreference::Dispatch),
            other => Err(TetherError::Config(format!(
                "unknown backend \"{other}\" (expected auto, dynamic or dispatch)"
            ))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Dynamic => "dynamic",
            BackendPreference::Dispatch => "dispatch",
        })
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Backend selection strategy.
    pub backend: BackendPreference,
    /// How often the reclamation daemon sweeps for leaked owners.
    pub sweep_interval_ms: u64,
    /// Thread name of the reclamation daemon.
    pub daemon_thread_name: String,
    /// Shared library the dynamic backend loads. `None` resolves symbols
    /// from the running process image.
    pub native_library: Option<PathBuf>,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            sweep_interval_ms: 500,
            daemon_thread_name: "tether-reclaim".into(),
            native_library: None,
        }
    }
}

static GLOBAL: OnceLock<TetherConfig> = OnceLock::new();

impl TetherConfig {
    /// Process configuration, loaded from the environment on first use.
    pub fn global() -> &'static TetherConfig {
        GLOBAL.get_or_init(TetherConfig::load)
    }

    /// Load from the environment, falling back to defaults on any error.
    pub fn load() -> Self {
        match Self::from_lookup(|key| std::env::var(key).ok()) {
            Ok(config) => {
                debug!(?config, "tether configuration loaded");
                config
            }
            Err(e) => {
                warn!(error = %e, "invalid tether configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG_PATH) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Some(backend) = lookup(ENV_BACKEND) {
            config.backend = backend.parse()?;
        }
        if let Some(ms) = lookup(ENV_SWEEP_INTERVAL_MS) {
            config.sweep_interval_ms = ms.trim().parse().map_err(|_| {
                TetherError::Config(format!("{ENV_SWEEP_INTERVAL_MS} is not a number: {ms}"))
            })?;
        }

        if let Some(path) = lookup(ENV_NATIVE_LIB) {
            config.native_library = (!path.is_empty()).then(|| PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            return Err(TetherError::Config(
                "sweep_interval_ms must be greater than zero".into(),
            ));
        }
        if self.daemon_thread_name.is_empty() {
            return Err(TetherError::Config("daemon_thread_name is empty".into()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
