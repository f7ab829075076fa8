//! Application configuration.

use crate::text::Locale;
use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Person directory (family registry) configuration.
    pub person_directory: PersonDirectoryConfig,
    /// Consent rules.
    #[serde(default)]
    pub consent: ConsentConfig,
    /// Confirmation document settings.
    #[serde(default)]
    pub documents: DocumentConfig,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Person directory client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonDirectoryConfig {
    /// Base URL of the registry, e.g. `https://registry.example/bidrag-person`.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Rule deciding whether a new request needs the counterparty's consent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentPolicy {
    /// Consent is required when every named child is shared with the counterparty.
    #[default]
    AllShared,
    /// Consent is required when at least one named child is shared with the counterparty.
    AnyShared,
}

/// Consent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentConfig {
    /// Which consent rule applies to new requests.
    #[serde(default)]
    pub policy: ConsentPolicy,
    /// Age at which a child is listed on its own in the party overview.
    #[serde(default = "default_self_consent_age")]
    pub self_consent_age: u32,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            policy: ConsentPolicy::default(),
            self_consent_age: default_self_consent_age(),
        }
    }
}

/// Confirmation document configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentConfig {
    /// Locale used when the caller does not ask for one.
    #[serde(default)]
    pub default_locale: Locale,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_self_consent_age() -> u32 {
    15
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `TRAVEL_COST_ENV`)
    /// 3. Environment variables with `TRAVEL_COST` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("TRAVEL_COST_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TRAVEL_COST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        tracing::debug!(environment = %env, "Loaded configuration sources");

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TRAVEL_COST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/travel_cost" },
            "person_directory": { "base_url": "http://localhost:8090/bidrag-person" }
        }))
        .unwrap();

        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.person_directory.timeout_secs, 30);
        assert_eq!(config.consent.policy, ConsentPolicy::AllShared);
        assert_eq!(config.consent.self_consent_age, 15);
        assert_eq!(config.documents.default_locale, Locale::Bokmal);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_consent_policy_from_snake_case() {
        let consent: ConsentConfig =
            serde_json::from_value(serde_json::json!({ "policy": "any_shared" })).unwrap();
        assert_eq!(consent.policy, ConsentPolicy::AnyShared);
        assert_eq!(consent.self_consent_age, 15);
    }
}
