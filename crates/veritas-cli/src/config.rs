//! CLI configuration loading and management.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use veritas_core::EngineConfig;

/// Full configuration for the `veritas` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VeritasConfig {
    /// Verification engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Keys trusted by the `signature` policy.
    #[serde(default)]
    pub trust: TrustConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrustConfig {
    /// Hex encoded Ed25519 public keys, by `kid` or issuer.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

const LOG_FORMATS: [&str; 2] = ["text", "json"];

impl VeritasConfig {
    /// Read `path`, or use the defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: VeritasConfig =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "logging.format must be one of {:?}, got {:?}",
                LOG_FORMATS,
                self.logging.format
            );
        }
        if self.engine.envelope.cwt_min_hex_length == 0 {
            anyhow::bail!("engine.envelope.cwt_min_hex_length must be positive");
        }
        for (id, key) in &self.trust.keys {
            if key.trim().len() != 64 {
                anyhow::bail!("trust.keys.{:?} must be 64 hex characters", id);
            }
        }
        Ok(())
    }
}
