use crate::models::AppConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the station configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "scanner.yaml";

/// Prefix of environment overrides, e.g. `RENTAL_SCAN_SERVER__BASE_URL`
pub const ENV_PREFIX: &str = "RENTAL_SCAN";

/// Configuration manager for loading and saving the station configuration.
///
/// Sources, lowest priority first:
/// - built-in defaults ([`AppConfig::default`])
/// - `scanner.yaml` in the config directory (optional)
/// - `RENTAL_SCAN_*` environment variables, `__` between section and key
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: ENV_PREFIX.to_string(),
        })
    }

    /// Use a different environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load the station configuration.
    ///
    /// # Returns
    /// The merged AppConfig; defaults fill anything neither the file nor the environment set
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults and environment",
                self.config_path
            );
        }

        let settings = Config::builder()
            .add_source(File::new(self.config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!(
            "Loaded config: server={}, lookup={}",
            config.server.base_url,
            config.server.lookup_path
        );
        Ok(config)
    }

    /// Save the station configuration as YAML.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager(prefix: &str) -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path)
            .unwrap()
            .with_env_prefix(prefix);
        (manager, temp_dir)
    }

    #[test]
    fn test_load_defaults_without_file() {
        let (manager, _temp_dir) = create_test_config_manager("RSCAN_UNIT_DEFAULTS");

        let config = manager.load_config().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager("RSCAN_UNIT_SAVE");

        let mut config = AppConfig::default();
        config.server.base_url = "https://rentals.local:8443".to_string();
        config.timing.resume_delay_ms = 3000;
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.server.base_url, "https://rentals.local:8443");
        assert_eq!(loaded.timing.resume_delay_ms, 3000);
        assert_eq!(loaded.decoder, config.decoder);
    }

    #[test]
    fn test_config_dir_created() {
        let temp_dir = TempDir::new().unwrap();
        let nested = Utf8PathBuf::try_from(temp_dir.path().join("RentalScan Data")).unwrap();

        let manager = ConfigManager::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(manager.config_path(), nested.join(CONFIG_FILE_NAME));
    }
}
