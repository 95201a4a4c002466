//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{WellKnownKind, WellKnownKinds};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace the well-known caches mirror; empty means all namespaces
    #[serde(default)]
    pub watch_namespace: String,

    /// Kinds resolved from the local caches instead of the scale sub-resource
    #[serde(default = "default_well_known_kinds")]
    pub well_known_kinds: Vec<WellKnownKind>,

    /// Period between API discovery refreshes
    #[serde(default = "default_discovery_refresh_seconds")]
    pub discovery_refresh_seconds: u64,

    /// Upper bound on the wait for the initial cache sync
    #[serde(default = "default_cache_sync_timeout_seconds")]
    pub cache_sync_timeout_seconds: u64,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerConfig,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_well_known_kinds() -> Vec<WellKnownKind> {
    WellKnownKind::all().to_vec()
}

fn default_discovery_refresh_seconds() -> u64 {
    300
}

fn default_cache_sync_timeout_seconds() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// The configured kinds as the set the resolver dispatches on
    pub fn well_known_kinds(&self) -> WellKnownKinds {
        self.well_known_kinds.iter().copied().collect()
    }

    /// `None` when watching all namespaces
    pub fn watch_namespace(&self) -> Option<&str> {
        if self.watch_namespace.is_empty() {
            None
        } else {
            Some(&self.watch_namespace)
        }
    }

    pub fn discovery_refresh_period(&self) -> Duration {
        Duration::from_secs(self.discovery_refresh_seconds)
    }

    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_sync_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: String::new(),
            well_known_kinds: default_well_known_kinds(),
            discovery_refresh_seconds: default_discovery_refresh_seconds(),
            cache_sync_timeout_seconds: default_cache_sync_timeout_seconds(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
