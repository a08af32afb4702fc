//! services/content_sync/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use party_content_core::limits::{ContentLimits, DEFAULT_CUSTOM_LIMIT};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub cache_dir: PathBuf,
    pub allow_anonymous: bool,
    pub auth_base_url: String,
    pub auth_redirect_url: String,
    pub limits: ContentLimits,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cache_dir = lookup("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./offline_cache"));

        let allow_anonymous = parse_or(&lookup, "ANONYMOUS_SESSIONS", true)?;

        let auth_base_url =
            lookup("AUTH_BASE_URL").unwrap_or_else(|| "http://localhost:9999".to_string());
        let auth_redirect_url =
            lookup("AUTH_REDIRECT_URL").unwrap_or_else(|| "partygames://auth-callback".to_string());

        // --- Per-kind custom content quotas ---
        let limits = ContentLimits {
            theme: parse_or(&lookup, "THEME_LIMIT", DEFAULT_CUSTOM_LIMIT)?,
            pair: parse_or(&lookup, "PAIR_LIMIT", DEFAULT_CUSTOM_LIMIT)?,
            question_set: parse_or(&lookup, "QUESTION_SET_LIMIT", DEFAULT_CUSTOM_LIMIT)?,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            log_level,
            cache_dir,
            allow_anonymous,
            auth_base_url,
            auth_redirect_url,
            limits,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/party")]))
            .expect("config");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.cache_dir, PathBuf::from("./offline_cache"));
        assert!(config.allow_anonymous);
        assert_eq!(config.limits, ContentLimits::default());
    }

    #[test]
    fn missing_database_url_is_reported() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[])),
            Err(ConfigError::MissingVar(name)) if name == "DATABASE_URL"
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/party"),
            ("RUST_LOG", "debug"),
            ("ANONYMOUS_SESSIONS", "false"),
            ("THEME_LIMIT", "25"),
        ]))
        .expect("config");
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(!config.allow_anonymous);
        assert_eq!(config.limits.theme, 25);
        assert_eq!(config.limits.pair, DEFAULT_CUSTOM_LIMIT);
    }

    #[test]
    fn bad_numbers_are_invalid_values() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/party"),
            ("PAIR_LIMIT", "many"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(name, _)) if name == "PAIR_LIMIT"));
    }
}
