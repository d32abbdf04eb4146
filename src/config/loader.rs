//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, and deep-merging of environment overlay files over
//! the base configuration.

use super::ImageflowConfig;
use crate::error::PipelineError;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const BASE_CONFIG_FILE: &str = "imageflow.yaml";

/// Loaded configuration with its provenance
pub struct ConfigManager {
    config: ImageflowConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>, PipelineError> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(
        config_dir: Option<PathBuf>,
    ) -> Result<Arc<ConfigManager>, PipelineError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration with an explicit environment.
    ///
    /// Useful for tests that must not mutate global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>, PipelineError> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let mut config = Self::load_and_merge_config(&config_directory, environment)?;

        // DATABASE_URL wins over the file when present, matching deployment
        // practice for secret-bearing URLs
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = Some(url);
        }

        config.validate()?;

        debug!(
            environment = %environment,
            source_backend = ?config.source.backend,
            sink_backend = ?config.sink.backend,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ImageflowConfig {
        &self.config
    }

    /// Get the detected environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the directory configuration was loaded from
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect environment from IMAGEFLOW_ENV / APP_ENV, defaulting to
    /// development
    pub fn detect_environment() -> String {
        env::var("IMAGEFLOW_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("IMAGEFLOW_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    /// Load the base file and deep-merge the environment overlay over it.
    ///
    /// A missing base file yields defaults (the binary may run purely on
    /// environment variables in development); a present-but-broken file is a
    /// fatal configuration error.
    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> Result<ImageflowConfig, PipelineError> {
        let base_path = config_directory.join(BASE_CONFIG_FILE);
        let overlay_path = config_directory.join(format!("imageflow-{environment}.yaml"));

        let mut merged: YamlValue = if base_path.exists() {
            Self::read_yaml_file(&base_path)?
        } else {
            debug!(
                path = %base_path.display(),
                "No base configuration file, starting from defaults"
            );
            YamlValue::Mapping(Default::default())
        };

        if overlay_path.exists() {
            let overlay = Self::read_yaml_file(&overlay_path)?;
            Self::deep_merge(&mut merged, overlay);
            debug!(path = %overlay_path.display(), "Applied environment overlay");
        }

        serde_yaml::from_value(merged).map_err(|e| {
            PipelineError::configuration(
                "loader",
                format!("Configuration did not deserialize: {e}"),
            )
        })
    }

    fn read_yaml_file(path: &Path) -> Result<YamlValue, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(
                "loader",
                format!("Failed to read {}: {e}", path.display()),
            )
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::configuration(
                "loader",
                format!("Failed to parse {}: {e}", path.display()),
            )
        })
    }

    /// Recursively merge `overlay` into `base`. Mappings merge key-by-key;
    /// any other value in the overlay replaces the base value outright.
    fn deep_merge(base: &mut YamlValue, overlay: YamlValue) {
        match (base, overlay) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(overlay_map)) => {
                for (key, overlay_value) in overlay_map {
                    match base_map.get_mut(&key) {
                        Some(base_value) => Self::deep_merge(base_value, overlay_value),
                        None => {
                            base_map.insert(key, overlay_value);
                        }
                    }
                }
            }
            (base_slot, overlay_value) => {
                *base_slot = overlay_value;
            }
        }
    }
}
