use super::{BackendConfig, ObservabilityConfig, PipelineConfig, PolicyConfig};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Extra attempts for transient backend failures within one stage.
    #[serde(default = "default_provider_retries")]
    pub provider_retries: u32,
    #[serde(default = "default_provider_backoff_ms")]
    pub provider_backoff_ms: u64,
}

fn default_provider_retries() -> u32 {
    2
}

fn default_provider_backoff_ms() -> u64 {
    250
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            provider_retries: default_provider_retries(),
            provider_backoff_ms: default_provider_backoff_ms(),
        }
    }
}

fn promptgate_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".promptgate")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: promptgate_dir().join("config.toml"),
            backend: BackendConfig::default(),
            pipeline: PipelineConfig::default(),
            reliability: ReliabilityConfig::default(),
            policy: PolicyConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Load `~/.promptgate/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let dir = UserDirs::new()
            .map(|u| u.home_dir().join(".promptgate"))
            .context("Could not find home directory")?;
        let config_path = dir.join("config.toml");

        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        fs::create_dir_all(&dir).context("Failed to create .promptgate directory")?;
        let config = Self {
            config_path,
            ..Self::default()
        };
        config.validate()?;
        config.save()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::Validation(format!(
                "backend.temperature must be in [0, 2], got {}",
                self.backend.temperature
            )));
        }
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "backend.model must not be empty".into(),
            ));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "backend.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.policy.max_numeric_tokens == 0 {
            return Err(ConfigError::Validation(
                "policy.max_numeric_tokens must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
