pub mod model;
pub mod nickname;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use model::{EngineConfig, LoggingConfig, ServerConfig};

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("asyncirc")
        .join("config.toml")
}

/// Load from the user config directory, falling back to defaults.
pub fn load_config() -> Result<EngineConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<EngineConfig> {
    toml::from_str(contents).with_context(|| "Failed to parse config file")
}

pub fn save_config_to(path: &Path, config: &EngineConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}
