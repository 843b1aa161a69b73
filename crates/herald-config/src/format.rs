//! Parsing emitter configs from JSONC, JSON or YAML text

use crate::schema::EmitterConfig;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Jsonc,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "jsonc" => Some(Self::Jsonc),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl EmitterConfig {
    /// Parses and validates `content` written in `format`.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Jsonc => json5::from_str(content).context("Failed to parse JSONC")?,
            ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON")?,
            ConfigFormat::Yaml => {
                serde_yaml_ng::from_str(content).context("Failed to parse YAML")?
            }
        };
        config.validate().context("Invalid emitter config")?;
        Ok(config)
    }

    /// Reads the config at `path`, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| anyhow!("Unknown config format for: {}", path.display()))?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content, format).with_context(|| format!("In {}", path.display()))
    }
}
