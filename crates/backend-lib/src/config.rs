// ============================
// idgate-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use axum_extra::extract::cookie::Key;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for environment overrides, e.g. `IDGATE_IDP__URL`
pub const ENV_PREFIX: &str = "IDGATE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// `text` or `json`
    pub log_format: LogFormat,
    pub idp: IdpSettings,
    pub directory: DirectorySettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
}

/// Identity provider connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpSettings {
    /// Base URL of the provider, e.g. `https://ipa.example.org`
    pub url: String,
    /// Skip TLS certificate verification (test deployments only)
    pub accept_invalid_certs: bool,
}

/// Service account used for user lookups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub bind_user: Option<String>,
    pub bind_password: Option<String>,
}

/// Session cookie options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Cookie lifetime in seconds
    pub max_age_secs: i64,
    /// Only send the cookie over HTTPS
    pub secure: bool,
    /// Base64 encoded key of at least 64 bytes used to encrypt the cookie
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Look the user up in the directory before contacting the provider
    pub precheck_user: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            idp: IdpSettings::default(),
            directory: DirectorySettings::default(),
            session: SessionSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

impl Default for IdpSettings {
    fn default() -> Self {
        Self {
            url: "https://localhost".to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "idgate-sess".to_string(),
            max_age_secs: 60 * 60 * 8, // 8 hours
            secure: true,
            key: None,
        }
    }
}

impl Settings {
    /// Load settings from the default config file and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load settings from `path` (missing files are skipped) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check the settings for values the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }

        if self.idp.url.trim().is_empty() {
            return Err(AppError::Config("idp.url must be set".to_string()));
        }

        if self.session.cookie_name.is_empty() {
            return Err(AppError::Config(
                "session.cookie_name must be set".to_string(),
            ));
        }

        if self.session.max_age_secs <= 0 {
            return Err(AppError::Config(
                "session.max_age_secs must be positive".to_string(),
            ));
        }

        if self.session.key.is_some() {
            self.cookie_key()?;
        }

        if self.auth.precheck_user && self.directory_credentials().is_none() {
            return Err(AppError::Config(
                "auth.precheck_user requires directory.bind_user and directory.bind_password"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Decode the configured cookie key, if any
    pub fn cookie_key(&self) -> Result<Option<Key>, AppError> {
        let Some(encoded) = self.session.key.as_deref() else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("session.key is not base64: {e}")))?;
        let key = Key::try_from(bytes.as_slice())
            .map_err(|_| AppError::Config("session.key must be at least 64 bytes".to_string()))?;
        Ok(Some(key))
    }

    /// Service account for directory lookups, when fully configured
    pub fn directory_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.directory.bind_user.as_deref(),
            self.directory.bind_password.as_deref(),
        ) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            },
            _ => None,
        }
    }
}
