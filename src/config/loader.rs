//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Kube-context-specific config
    /// 3. Root config
    /// 4. Built-in defaults
    pub fn load(context: Option<&str>) -> Result<Config> {
        let context_path = context.map(paths::context_config_path);
        let config = Self::load_layers(&paths::root_config_path(), context_path.as_deref())?;
        let config = Self::apply_env_overrides(config)?;
        Self::check(&config)?;
        Ok(config)
    }

    /// Merge the root file and an optional context file over the defaults
    ///
    /// Missing files are skipped. Keys absent from a layer keep the value of
    /// the layer below.
    pub fn load_layers(root: &Path, context: Option<&Path>) -> Result<Config> {
        let mut merged = serde_yaml::to_value(Self::load_defaults())
            .context("Failed to serialize default configuration")?;

        for path in std::iter::once(root).chain(context) {
            if let Some(layer) = Self::load_layer(path)? {
                merged = Self::merge_config(merged, layer);
            }
        }

        serde_yaml::from_value(merged).context("Failed to build merged configuration")
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn load_layer(path: &Path) -> Result<Option<Value>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let value: Value = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // An empty file parses to null
        Ok((!value.is_null()).then_some(value))
    }

    /// Validate every config file that would be loaded, then the merged result
    ///
    /// This performs strict validation - it will fail on:
    /// - Invalid YAML syntax
    /// - Unknown well-known kinds and invalid value types
    /// - Semantic errors in the merged config (see [`ConfigLoader::check`])
    pub fn validate(context: Option<&str>) -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            let config = Self::load_file(&root_path)?;
            Self::check(&config)
                .with_context(|| format!("Invalid config file: {}", root_path.display()))?;
        }

        if let Some(ctx) = context {
            let context_path = paths::context_config_path(ctx);
            if context_path.exists() {
                Self::load_file(&context_path)?;
            }
        }

        let _ = Self::load(context).context("Failed to load merged configuration")?;

        Ok(())
    }

    /// Semantic checks serde cannot express
    pub fn check(config: &Config) -> Result<()> {
        let mut seen = HashSet::new();
        for kind in &config.well_known_kinds {
            if !seen.insert(kind) {
                return Err(anyhow::anyhow!(
                    "wellKnownKinds lists {} more than once",
                    kind
                ));
            }
        }

        if config.discovery_refresh_seconds == 0 {
            return Err(anyhow::anyhow!(
                "discoveryRefreshSeconds must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Merge two YAML documents, with `other` taking precedence
    ///
    /// Mappings are merged key by key; any other value in `other` replaces
    /// the one in `base`, sequences included.
    fn merge_config(base: Value, other: Value) -> Value {
        match (base, other) {
            (Value::Mapping(mut base), Value::Mapping(other)) => {
                for (key, value) in other {
                    let merged = match base.remove(&key) {
                        Some(existing) => Self::merge_config(existing, value),
                        None => value,
                    };
                    base.insert(key, merged);
                }
                Value::Mapping(base)
            }
            (_, other) => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Runs before logging is set up, so a bad value is an error rather than
    /// a warning nobody sees.
    fn apply_env_overrides(mut config: Config) -> Result<Config> {
        // OWNERCHAIN_WATCH_NAMESPACE override
        if let Ok(namespace) = std::env::var("OWNERCHAIN_WATCH_NAMESPACE") {
            config.watch_namespace = namespace;
        }

        // OWNERCHAIN_LOG_LEVEL override
        if let Ok(level) = std::env::var("OWNERCHAIN_LOG_LEVEL") {
            config.logger.level = level;
        }

        // OWNERCHAIN_DISCOVERY_REFRESH_SECONDS override
        if let Ok(seconds) = std::env::var("OWNERCHAIN_DISCOVERY_REFRESH_SECONDS") {
            config.discovery_refresh_seconds = seconds.parse::<u64>().with_context(|| {
                format!(
                    "Invalid OWNERCHAIN_DISCOVERY_REFRESH_SECONDS '{}', expected whole seconds",
                    seconds
                )
            })?;
        }

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<PathBuf> {
        let path = paths::root_config_path();
        Self::save(config, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WellKnownKind;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.discovery_refresh_seconds, 300);
        assert_eq!(config.well_known_kinds.len(), 6);
    }

    #[test]
    fn test_merge_config_keeps_unset_keys() {
        let base: Value = serde_yaml::from_str(
            "watchNamespace: a\nlogger:\n  level: info\ncacheSyncTimeoutSeconds: 10\n",
        )
        .unwrap();
        let other: Value = serde_yaml::from_str("logger:\n  level: debug\n").unwrap();

        let merged: Config =
            serde_yaml::from_value(ConfigLoader::merge_config(base, other)).unwrap();
        assert_eq!(merged.watch_namespace, "a");
        assert_eq!(merged.logger.level, "debug");
        assert_eq!(merged.cache_sync_timeout_seconds, 10);
    }

    #[test]
    fn test_merge_config_replaces_lists() {
        let base = serde_yaml::to_value(Config::default()).unwrap();
        let other: Value = serde_yaml::from_str("wellKnownKinds: [Job]\n").unwrap();

        let merged: Config =
            serde_yaml::from_value(ConfigLoader::merge_config(base, other)).unwrap();
        assert_eq!(merged.well_known_kinds, vec![WellKnownKind::Job]);
    }

    #[test]
    fn test_check_rejects_duplicates_and_zero_period() {
        let duplicated = Config {
            well_known_kinds: vec![WellKnownKind::Deployment, WellKnownKind::Deployment],
            ..Default::default()
        };
        let err = ConfigLoader::check(&duplicated).unwrap_err();
        assert!(err.to_string().contains("Deployment"));

        let zero = Config {
            discovery_refresh_seconds: 0,
            ..Default::default()
        };
        assert!(ConfigLoader::check(&zero).is_err());

        assert!(ConfigLoader::check(&Config::default()).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: set_var is unsafe in Rust 2024 due to potential data races.
        // No other test in this binary reads these variables.
        unsafe {
            std::env::set_var("OWNERCHAIN_WATCH_NAMESPACE", "team-b");
            std::env::set_var("OWNERCHAIN_LOG_LEVEL", "trace");
            std::env::set_var("OWNERCHAIN_DISCOVERY_REFRESH_SECONDS", "120");
        }

        let config = ConfigLoader::apply_env_overrides(Config::default()).unwrap();

        assert_eq!(config.watch_namespace, "team-b");
        assert_eq!(config.logger.level, "trace");
        assert_eq!(config.discovery_refresh_seconds, 120);

        // SAFETY: as above.
        unsafe {
            std::env::set_var("OWNERCHAIN_DISCOVERY_REFRESH_SECONDS", "not-a-number");
        }

        let err = ConfigLoader::apply_env_overrides(Config::default()).unwrap_err();
        assert!(err.to_string().contains("'not-a-number'"));

        // SAFETY: as above.
        unsafe {
            std::env::remove_var("OWNERCHAIN_WATCH_NAMESPACE");
            std::env::remove_var("OWNERCHAIN_LOG_LEVEL");
            std::env::remove_var("OWNERCHAIN_DISCOVERY_REFRESH_SECONDS");
        }
    }
}
