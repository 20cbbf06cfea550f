use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use batch_desk_core::interpreter::DEFAULT_ASSIGNED_BY;
use batch_desk_core::store::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_uploaded_by")]
    pub uploaded_by: String,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            uploaded_by: default_uploaded_by(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_uploaded_by() -> String {
    "current.user@company.com".to_string()
}
fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_assigned_by")]
    pub assigned_by: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
            assigned_by: default_assigned_by(),
        }
    }
}

fn default_reply_delay_ms() -> u64 {
    1000
}
fn default_assigned_by() -> String {
    DEFAULT_ASSIGNED_BY.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_cas_attempts: default_max_cas_attempts(),
        }
    }
}

fn default_max_cas_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/bdesk.sqlite"),
            },
            import: ImportConfig::default(),
            assistant: AssistantConfig::default(),
            listing: ListingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.import.max_file_bytes == 0 {
        anyhow::bail!("import.max_file_bytes must be > 0");
    }

    if config.import.uploaded_by.trim().is_empty() {
        anyhow::bail!("import.uploaded_by must not be empty");
    }

    if config.assistant.assigned_by.trim().is_empty() {
        anyhow::bail!("assistant.assigned_by must not be empty");
    }

    if config.listing.page_size == 0 {
        anyhow::bail!("listing.page_size must be > 0");
    }

    if config.store.max_cas_attempts < 1 {
        anyhow::bail!("store.max_cas_attempts must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn only_db_is_required() {
        let cfg = parse("[db]\npath = \"x.sqlite\"\n").unwrap();
        assert_eq!(cfg.import.uploaded_by, "current.user@company.com");
        assert_eq!(cfg.import.max_file_bytes, 10_485_760);
        assert_eq!(cfg.assistant.reply_delay_ms, 1000);
        assert_eq!(cfg.assistant.assigned_by, "ai-assistant");
        assert_eq!(cfg.listing.page_size, 10);
        assert_eq!(cfg.store.max_cas_attempts, 8);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = parse("[db]\npath = \"x\"\n[listing]\npage_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("listing.page_size"));
    }

    #[test]
    fn blank_assigned_by_is_rejected() {
        let err = parse("[db]\npath = \"x\"\n[assistant]\nassigned_by = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("assistant.assigned_by"));
    }

    #[test]
    fn missing_db_section_fails_to_parse() {
        assert!(parse("[listing]\npage_size = 5\n").is_err());
    }
}
