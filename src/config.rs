//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - helios.toml (default configuration)
//! - helios.local.toml (git-ignored local overrides)
//! - Environment variables (HELIOS_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # helios.toml
//! [builder]
//! max_is_any_of_expansion = 10000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! HELIOS_BUILDER__MAX_IS_ANY_OF_EXPANSION=5000
//! HELIOS_LOGGING__LEVEL=debug
//! ```

use crate::error::ConfigError;
use crate::trace::TraceLevel;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration: one section per ambient concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeliosConfig {
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Compile-time safety caps, grouped separately from the matching
/// engine's own per-call tuning (`MatchOptions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Per-rule cap on the Cartesian-product expansion of `IS_ANY_OF`
    /// conditions. Compilation aborts with `CompilationError::ExpansionTooLarge`
    /// rather than silently consuming unbounded memory once a rule's
    /// expansion would exceed it.
    #[serde(default = "default_max_expansion")]
    pub max_is_any_of_expansion: usize,
    /// Trace level new `MatchingEngine` callers get when they don't pass
    /// an explicit `MatchOptions`.
    #[serde(default)]
    pub default_trace_level: TraceLevel,
}

fn default_max_expansion() -> usize {
    10_000
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            max_is_any_of_expansion: default_max_expansion(),
            default_trace_level: TraceLevel::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for HeliosConfig {
    fn default() -> Self {
        HeliosConfig {
            builder: BuilderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HeliosConfig {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. helios.toml (base configuration)
    /// 2. helios.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (HELIOS_* prefix)
    pub fn load() -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file("helios.toml"))
            .merge(Toml::file("helios.local.toml"))
            .merge(Env::prefixed("HELIOS_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("HELIOS_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }
}
