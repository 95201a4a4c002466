//! Configuration system for ownerchain
//!
//! Layered YAML configuration: built-in defaults, a root file, an optional
//! file per kube context and environment variable overrides.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, LoggerConfig};

use anyhow::Context;

use crate::models::WellKnownKind;

/// Every key understood by [`get_config_value`]
pub const CONFIG_KEYS: &[&str] = &[
    "watchNamespace",
    "wellKnownKinds",
    "discoveryRefreshSeconds",
    "cacheSyncTimeoutSeconds",
    "logger.level",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "watchNamespace" => Ok(config.watch_namespace.clone()),
        "wellKnownKinds" => Ok(config
            .well_known_kinds
            .iter()
            .map(WellKnownKind::as_str)
            .collect::<Vec<_>>()
            .join(",")),
        "discoveryRefreshSeconds" => Ok(config.discovery_refresh_seconds.to_string()),
        "cacheSyncTimeoutSeconds" => Ok(config.cache_sync_timeout_seconds.to_string()),
        "logger.level" => Ok(config.logger.level.clone()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "watchNamespace" => {
            config.watch_namespace = value.to_string();
        }
        "wellKnownKinds" => {
            // Comma-separated list of kind names
            config.well_known_kinds = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<WellKnownKind>()
                        .map_err(|e| anyhow::anyhow!("wellKnownKinds: {}", e))
                })
                .collect::<anyhow::Result<_>>()?;
        }
        "discoveryRefreshSeconds" => {
            config.discovery_refresh_seconds = value
                .parse()
                .context("discoveryRefreshSeconds must be a number")?;
        }
        "cacheSyncTimeoutSeconds" => {
            config.cache_sync_timeout_seconds = value
                .parse()
                .context("cacheSyncTimeoutSeconds must be a number")?;
        }
        "logger.level" => {
            config.logger.level = value.to_string();
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_is_readable() {
        let config = Config::default();
        for key in CONFIG_KEYS {
            assert!(get_config_value(&config, key).is_ok(), "{key}");
        }
        assert!(get_config_value(&config, "nope").is_err());
    }

    #[test]
    fn test_set_well_known_kinds() {
        let mut config = Config::default();
        set_config_value(&mut config, "wellKnownKinds", "Deployment, ReplicaSet").unwrap();
        assert_eq!(
            get_config_value(&config, "wellKnownKinds").unwrap(),
            "Deployment,ReplicaSet"
        );

        let err = set_config_value(&mut config, "wellKnownKinds", "Deployment,Rollout");
        assert!(err.is_err());
    }

    #[test]
    fn test_set_number_rejects_text() {
        let mut config = Config::default();
        assert!(set_config_value(&mut config, "discoveryRefreshSeconds", "soon").is_err());
        set_config_value(&mut config, "discoveryRefreshSeconds", "30").unwrap();
        assert_eq!(config.discovery_refresh_seconds, 30);
    }
}
