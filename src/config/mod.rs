//! Configuration loading for the IGA provider.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `IGA_`, producing a typed [`AppConfig`]. Values supplied by the host
//! runtime's provider block are merged on top with [`AppConfig::merge_provider_block`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment prefix for every provider setting.
pub const ENV_PREFIX: &str = "IGA_";

/// Variable that enables the state-only delete path used by acceptance tests.
pub const ACCEPTANCE_TEST_VAR: &str = "TF_ACC";

/// Number of token refreshes a single call may trigger before giving up.
pub const MAX_401_RETRIES: u32 = 2;

const MAX_UNAUTHORIZED_RETRIES_CEILING: u32 = 5;

/// Provider configuration derived from `IGA_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_max_unauthorized_retries")]
    pub max_unauthorized_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Connection settings written in the host's provider block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderBlock {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Fully resolved credentials needed to open a session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub server_url: Url,
    pub username: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            server_url: None,
            username: None,
            password: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            max_unauthorized_retries: default_max_unauthorized_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.password.is_some() {
            config.password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration.
    ///
    /// Connection settings may still be absent here; they are only required
    /// once the host supplies its provider block (see [`AppConfig::credentials`]).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref server_url) = self.server_url {
            parse_server_url(server_url)?;
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.max_unauthorized_retries > MAX_UNAUTHORIZED_RETRIES_CEILING {
            return Err(ConfigError::InvalidUnauthorizedRetries {
                value: self.max_unauthorized_retries,
                max: MAX_UNAUTHORIZED_RETRIES_CEILING,
            });
        }

        Ok(())
    }

    /// Overlay non-empty values from the host's provider block.
    pub fn merge_provider_block(&mut self, block: &ProviderBlock) {
        if let Some(value) = non_empty(block.server_url.as_deref()) {
            self.server_url = Some(value);
        }
        if let Some(value) = non_empty(block.username.as_deref()) {
            self.username = Some(value);
        }
        if let Some(value) = non_empty(block.password.as_deref()) {
            self.password = Some(value);
        }
    }

    /// Resolve the settings required to log in.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let server_url = non_empty(self.server_url.as_deref())
            .ok_or(ConfigError::MissingSetting { name: "server_url" })?;
        let username = non_empty(self.username.as_deref())
            .ok_or(ConfigError::MissingSetting { name: "username" })?;
        let password = non_empty(self.password.as_deref())
            .ok_or(ConfigError::MissingSetting { name: "password" })?;

        Ok(Credentials {
            server_url: parse_server_url(&server_url)?,
            username,
            password,
        })
    }
}

/// True when the acceptance-test bypass is enabled in the process environment.
pub fn acceptance_test_mode() -> bool {
    env::var(ACCEPTANCE_TEST_VAR)
        .map(|value| !value.is_empty())
        .unwrap_or(false)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_server_url(value: &str) -> Result<Url, ConfigError> {
    let mut candidate = value.trim().to_string();
    if !candidate.ends_with('/') {
        candidate.push('/');
    }
    let url = Url::parse(&candidate).map_err(|source| ConfigError::InvalidServerUrl {
        value: value.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            value: value.to_string(),
        });
    }
    Ok(url)
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_max_unauthorized_retries() -> u32 {
    MAX_401_RETRIES
}

fn default_user_agent() -> String {
    format!("iga-provider/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid server url '{value}': {source}")]
    InvalidServerUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("server url '{value}' must use http or https")]
    UnsupportedScheme { value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("max unauthorized retries must be between 0 and {max}, got {value}")]
    InvalidUnauthorizedRetries { value: u32, max: u32 },
    #[error("invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{name} is missing; set it in the provider block or IGA_{} environment variable", name.to_ascii_uppercase())]
    MissingSetting { name: &'static str },
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let server_url = layered.remove("SERVER_URL").and_then(|v| non_empty(Some(&v)));
        let username = layered.remove("USERNAME").and_then(|v| non_empty(Some(&v)));
        let password = layered.remove("PASSWORD").filter(|v| !v.is_empty());
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let max_unauthorized_retries = match layered.remove("MAX_UNAUTHORIZED_RETRIES") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        key: "IGA_MAX_UNAUTHORIZED_RETRIES",
                        value: raw.clone(),
                    })?
            }
            _ => default_max_unauthorized_retries(),
        };
        let user_agent = layered
            .remove("USER_AGENT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_user_agent);

        let config = AppConfig {
            profile,
            server_url,
            username,
            password,
            log_level,
            log_format,
            max_unauthorized_retries,
            user_agent,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_unauthorized_retries, MAX_401_RETRIES);
        assert!(config.user_agent.starts_with("iga-provider/"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            log_format: "xml".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));

        let config = AppConfig {
            max_unauthorized_retries: 9,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUnauthorizedRetries { value: 9, .. })
        ));

        let config = AppConfig {
            server_url: Some("not a url".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            server_url: Some("ftp://iga.example.com".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_provider_block_overrides_environment() {
        let mut config = AppConfig {
            server_url: Some("https://env.example.com".to_string()),
            username: Some("env-user".to_string()),
            password: Some("env-pass".to_string()),
            ..AppConfig::default()
        };
        config.merge_provider_block(&ProviderBlock {
            server_url: Some("https://host.example.com/".to_string()),
            username: Some("  ".to_string()),
            password: None,
        });

        let creds = config.credentials().unwrap();
        assert_eq!(creds.server_url.as_str(), "https://host.example.com/");
        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.password, "env-pass");
    }

    #[test]
    fn test_credentials_require_every_setting() {
        let config = AppConfig {
            server_url: Some("https://iga.example.com".to_string()),
            username: Some("admin".to_string()),
            ..AppConfig::default()
        };
        match config.credentials() {
            Err(ConfigError::MissingSetting { name }) => assert_eq!(name, "password"),
            other => panic!("expected missing password, got {other:?}"),
        }
    }

    #[test]
    fn test_server_url_gains_trailing_slash() {
        let url = parse_server_url("https://iga.example.com/tenant").unwrap();
        assert_eq!(url.as_str(), "https://iga.example.com/tenant/");
        assert_eq!(
            url.join("ECM/api/login").unwrap().as_str(),
            "https://iga.example.com/tenant/ECM/api/login"
        );
    }

    #[test]
    fn test_redacted_json_hides_password() {
        let config = AppConfig {
            password: Some("hunter2".to_string()),
            ..AppConfig::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("[REDACTED]"));
    }
}
