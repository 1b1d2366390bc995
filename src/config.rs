//! Startup configuration and bearer token resolution.

use crate::client::DEFAULT_BASE_URL;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOKEN_ENV: &str = "OPSBEACON_TOKEN";
pub const CONFIG_PATH_ENV: &str = "OPSBEACON_CONFIG_PATH";
pub const API_URL_ENV: &str = "OPSBEACON_API_URL";
pub const HTTP_ADDR_ENV: &str = "OPSBEACON_MCP_HTTP_ADDR";

const DESKTOP_CONFIG_FILE: &str = "claude_desktop_config.json";
/// Location of the token inside the desktop config file.
const TOKEN_POINTER: &str = "/mcpServers/opsbeacon/env/OPSBEACON_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} not found at {}", DESKTOP_CONFIG_FILE, .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error("Error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} not found in {}", TOKEN_ENV, .0.display())]
    TokenNotFound(PathBuf),

    #[error("{0} is set but empty")]
    EmptyToken(String),

    #[error("Could not determine the platform config directory; set {}", TOKEN_ENV)]
    NoConfigDir,

    #[error("Invalid {} value {value:?}: {source}", HTTP_ADDR_ENV)]
    InvalidHttpAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Where the bearer token can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// An environment variable.
    Env(String),
    /// A desktop config file holding `mcpServers.opsbeacon.env.OPSBEACON_TOKEN`.
    ConfigFile(PathBuf),
}

impl TokenSource {
    /// Read the token. `Ok(None)` means this source has nothing to offer.
    pub fn read<F>(&self, lookup: &F) -> Result<Option<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            TokenSource::Env(var) => match lookup(var) {
                Some(token) if token.trim().is_empty() => Err(ConfigError::EmptyToken(var.clone())),
                Some(token) => Ok(Some(token)),
                None => Ok(None),
            },
            TokenSource::ConfigFile(path) => read_token_file(path).map(Some),
        }
    }
}

/// Try each source in order and return the first token found.
///
/// The last source's error is reported when none yields a token.
pub fn resolve_token<F>(sources: &[TokenSource], lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut last_err = ConfigError::NoConfigDir;
    for source in sources {
        match source.read(lookup) {
            Ok(Some(token)) => {
                tracing::debug!(?source, "Resolved Opsbeacon token");
                return Ok(token);
            }
            Ok(None) => {}
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn read_token_file(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::ConfigFileNotFound(path.to_path_buf()),
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let config: Value = serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        source: e,
    })?;

    match config.pointer(TOKEN_POINTER).and_then(Value::as_str) {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ConfigError::TokenNotFound(path.to_path_buf())),
    }
}

/// Default desktop config location for this platform.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("Claude").join(DESKTOP_CONFIG_FILE))
}

/// Transport the MCP server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http(SocketAddr),
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub transport: Transport,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_config_path())
    }

    /// Load configuration using `lookup` for environment variables.
    pub fn from_lookup<F>(lookup: F, default_path: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sources = vec![TokenSource::Env(TOKEN_ENV.to_string())];
        if let Some(path) = lookup(CONFIG_PATH_ENV).map(PathBuf::from).or(default_path) {
            sources.push(TokenSource::ConfigFile(path));
        }
        let token = resolve_token(&sources, &lookup)?;

        let api_url = lookup(API_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let transport = match lookup(HTTP_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            Some(value) => Transport::Http(value.trim().parse::<SocketAddr>().map_err(|source| {
                ConfigError::InvalidHttpAddr { value, source }
            })?),
            None => Transport::Stdio,
        };

        Ok(Self {
            token,
            api_url,
            transport,
        })
    }
}
