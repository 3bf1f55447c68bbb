//! Edge server configuration loaded from the environment.
//!
//! DESIGN
//! ======
//! `from_lookup` takes the variable source as a closure so tests can feed a
//! map instead of mutating process-wide environment variables. `from_env`
//! is the production entry point.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_SITE_DIR: &str = "./site";
const DEFAULT_PROTECTED_PREFIXES: &str = "/admin";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_HOME_PATH: &str = "/";
const DEFAULT_TOKEN_COOKIE: &str = "token";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT `{0}`")]
    InvalidPort(String),
    #[error("{key} must be an absolute path starting with `/`, got `{value}`")]
    InvalidPath { key: &'static str, value: String },
    #[error("TOKEN_COOKIE must not be empty")]
    EmptyCookieName,
}

/// Rules for the edge redirect filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Paths beginning with any of these require a bearer token.
    pub protected_prefixes: Vec<String>,
    pub login_path: String,
    pub home_path: String,
    /// Cookie carrying the bearer token.
    pub token_cookie: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec![DEFAULT_PROTECTED_PREFIXES.to_owned()],
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            home_path: DEFAULT_HOME_PATH.to_owned(),
            token_cookie: DEFAULT_TOKEN_COOKIE.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Directory holding the built front-end, served for every allowed request.
    pub site_dir: PathBuf,
    pub gate: GateConfig,
}

impl ServerConfig {
    /// Load from `PORT`, `BIND_ADDR`, `SITE_DIR`, `PROTECTED_PREFIXES`,
    /// `LOGIN_PATH`, `HOME_PATH`, and `TOKEN_COOKIE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unparseable port or a non-absolute path.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unparseable port or a non-absolute path.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let site_dir = PathBuf::from(var("SITE_DIR").unwrap_or_else(|| DEFAULT_SITE_DIR.to_owned()));

        let protected_prefixes =
            parse_prefixes(&var("PROTECTED_PREFIXES").unwrap_or_else(|| DEFAULT_PROTECTED_PREFIXES.to_owned()))?;
        let login_path = absolute_path("LOGIN_PATH", var("LOGIN_PATH").unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_owned()))?;
        let home_path = absolute_path("HOME_PATH", var("HOME_PATH").unwrap_or_else(|| DEFAULT_HOME_PATH.to_owned()))?;
        let token_cookie = match lookup("TOKEN_COOKIE") {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::EmptyCookieName),
            Some(raw) => raw.trim().to_owned(),
            None => DEFAULT_TOKEN_COOKIE.to_owned(),
        };

        Ok(Self {
            bind_addr,
            port,
            site_dir,
            gate: GateConfig { protected_prefixes, login_path, home_path, token_cookie },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn absolute_path(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.starts_with('/') { Ok(value) } else { Err(ConfigError::InvalidPath { key, value }) }
}

/// Parse a comma-separated prefix list. Trailing slashes are dropped so
/// `/admin/` and `/admin` behave the same; empty entries are skipped.
pub(crate) fn parse_prefixes(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| {
            let prefix = absolute_path("PROTECTED_PREFIXES", prefix.to_owned())?;
            let trimmed = prefix.trim_end_matches('/');
            Ok(if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() })
        })
        .collect()
}
