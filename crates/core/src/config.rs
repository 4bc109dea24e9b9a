//! Application configuration layered from defaults, a TOML file and the environment.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Directory under the platform config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "listings";
/// Prefix for environment overrides, e.g. `LISTINGS_SERVER_BASE_URL`.
pub const ENV_PREFIX: &str = "LISTINGS";

const DEFAULT_CONFIG: &str = r#"# Base URL used for requests issued while rendering on the server.
server_base_url = "http://localhost:5000"
# Base URL used by the client once the page is mounted.
client_base_url = "http://localhost:3000"
# Route the auth guard redirects to.
sign_in_route = "/signin"
revalidate_on_focus = true
revalidate_on_reconnect = true
# token = "<bearer token for the terminal client>"
"#;

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A base URL did not parse.
    #[error("invalid {field}: {value}")]
    InvalidUrl {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL for server-side fetches.
    pub server_base_url: String,
    /// Base URL for client-side fetches.
    pub client_base_url: String,
    /// Route the auth guard navigates to.
    pub sign_in_route: String,
    /// Revalidate mounted resources when the client regains focus.
    pub revalidate_on_focus: bool,
    /// Revalidate mounted resources when connectivity returns.
    pub revalidate_on_reconnect: bool,
    /// Token cookie value used by the terminal client.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_base_url: "http://localhost:5000".to_string(),
            client_base_url: "http://localhost:3000".to_string(),
            sign_in_route: "/signin".to_string(),
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            token: None,
        }
    }
}

impl AppConfig {
    /// Load from the default config file location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path().as_deref())
    }

    /// Load from an explicit file (optional) plus environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("failed to encode defaults")?,
        );
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration")?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both base URLs parse and can carry a path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url(true)?;
        self.parsed_base_url(false)?;
        Ok(())
    }

    /// Parsed base URL for the given side of the render.
    pub fn parsed_base_url(&self, is_server: bool) -> Result<Url, ConfigError> {
        let (field, value) = if is_server {
            ("server_base_url", &self.server_base_url)
        } else {
            ("client_base_url", &self.client_base_url)
        };
        let invalid = || ConfigError::InvalidUrl {
            field,
            value: value.clone(),
        };
        let url = Url::parse(value).map_err(|_| invalid())?;
        if url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(url)
    }

    /// Base URL for the given side of the render.
    pub fn base_url(&self, is_server: bool) -> &str {
        if is_server {
            &self.server_base_url
        } else {
            &self.client_base_url
        }
    }
}

/// Default location of `config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join("config.toml"))
}

/// Write a commented default config file when none exists yet.
pub fn ensure_default_config() -> Result<()> {
    match config_path() {
        Some(path) => write_default_config(&path),
        None => Ok(()),
    }
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}
