use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

/// Name of the optional config file at the source root.
pub const CONFIG_FILE: &str = "config.toml";

/// Prefix of environment variables overriding config keys,
/// e.g. `HELLFIRE_URL` or `HELLFIRE_PANDOC__TIMEOUT_SECS`.
const ENV_PREFIX: &str = "HELLFIRE";

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_PANDOC: &str = "pandoc";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{} is missing the required `{key}` key", path.display())]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("{0}")]
    Validation(String),
}

// =============================================================================
// Site configuration
// =============================================================================

/// Site settings from `config.toml`:
///
/// ```toml
/// url = "https://blog.example"
/// date_format = "%Y-%m-%d"
///
/// [pandoc]
/// program = "pandoc"
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL the site is deployed at, without a trailing slash
    pub url: String,
    /// strftime format for dates shown on pages
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub pandoc: PandocConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PandocConfig {
    #[serde(default = "default_pandoc")]
    pub program: String,
    /// Seconds before a single conversion is abandoned
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PandocConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            program: default_pandoc(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_pandoc() -> String {
    DEFAULT_PANDOC.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// =============================================================================
// Config loading
// =============================================================================

impl SiteConfig {
    /// Load `config.toml` from the source root, with environment overrides.
    ///
    /// Without a config file the site URL is empty. A config file that
    /// exists must set `url`.
    pub fn load(source_root: &Path) -> Result<Self, ConfigError> {
        let path = source_root.join(CONFIG_FILE);

        let mut builder = ::config::Config::builder();
        if path.is_file() {
            builder = builder.add_source(
                ::config::File::from(path.as_path()).format(::config::FileFormat::Toml),
            );
        } else {
            builder = builder.set_default("url", "")?;
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        if settings.get_string("url").is_err() {
            return Err(ConfigError::MissingKey { path, key: "url" });
        }

        let mut config: SiteConfig = settings.try_deserialize()?;
        config.url = config.url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but can't be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Validation(format!(
                "invalid date_format `{}`",
                self.date_format
            )));
        }

        if self.pandoc.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pandoc.program must not be empty".to_string(),
            ));
        }

        if self.pandoc.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "pandoc.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
