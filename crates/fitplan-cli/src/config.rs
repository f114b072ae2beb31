//! Configuration file management for fitplan.
//!
//! Provides a TOML config file at `~/.config/fitplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use fitplan_core::GroqConfig;
use fitplan_core::generation::groq::{DEFAULT_MODEL, DEFAULT_TIMEOUT};
use fitplan_db::config::DbConfig;

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const MODEL_ENV: &str = "FITPLAN_MODEL";
pub const TIMEOUT_ENV: &str = "FITPLAN_GENERATION_TIMEOUT_SECS";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the fitplan config directory: `$XDG_CONFIG_HOME/fitplan` or
/// `~/.config/fitplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("fitplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fitplan")
}

/// Return the path to the fitplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold an API key, so it is made owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Generation provider settings after resolution.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct FitplanConfig {
    pub db_config: DbConfig,
    pub generation: GenerationSettings,
}

impl FitplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `FITPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - API key: `GROQ_API_KEY` > `generation.api_key` > none
    /// - Model: `cli_model` > `FITPLAN_MODEL` > `generation.model` > default model
    /// - Timeout: `FITPLAN_GENERATION_TIMEOUT_SECS` > `generation.timeout_secs` > 120s
    pub fn resolve(cli_db_url: Option<&str>, cli_model: Option<&str>) -> Result<Self> {
        Self::resolve_from(load_config().ok(), cli_db_url, cli_model)
    }

    fn resolve_from(
        file_config: Option<ConfigFile>,
        cli_db_url: Option<&str>,
        cli_model: Option<&str>,
    ) -> Result<Self> {
        let generation_file = file_config.as_ref().map(|c| &c.generation);

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| generation_file.and_then(|g| g.api_key.clone()));

        let model = if let Some(model) = cli_model {
            model.to_string()
        } else if let Ok(model) = std::env::var(MODEL_ENV) {
            model
        } else if let Some(model) = generation_file.and_then(|g| g.model.clone()) {
            model
        } else {
            DEFAULT_MODEL.to_string()
        };

        let timeout = if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
            Duration::from_secs(secs)
        } else if let Some(secs) = generation_file.and_then(|g| g.timeout_secs) {
            Duration::from_secs(secs)
        } else {
            DEFAULT_TIMEOUT
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            generation: GenerationSettings {
                api_key,
                model,
                timeout,
            },
        })
    }

    /// Build the Groq client settings. Fails when no API key was found.
    pub fn groq_config(&self) -> Result<GroqConfig> {
        let Some(api_key) = self.generation.api_key.clone() else {
            bail!(
                "Groq API key not found; set {API_KEY_ENV} or run `fitplan init --api-key <key>`"
            );
        };
        let mut config = GroqConfig::new(api_key);
        config.model = self.generation.model.clone();
        config.timeout = self.generation.timeout;
        Ok(config)
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
