//! Configuration module for taskhub.
//!
//! Deployment injects settings exclusively through environment variables
//! (`DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASS`, plus the optional
//! `DB_PORT`, `SECRET_KEY`, `DEBUG`, `ALLOWED_HOSTS`, `HOST`, `PORT`).
//! They are read exactly once, at startup, into a typed [`Config`] that
//! is handed to the components needing it; nothing else in the tree
//! consults the process environment.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment};
use serde::Deserialize;

/// Signing secret used when `SECRET_KEY` is not provided. Fine for local
/// development, logged as a warning otherwise.
pub const DEV_SECRET_KEY: &str = "insecure-dev-secret-key";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub runtime: RuntimeConfig,
}

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    /// Retry budget for the startup readiness gate.
    pub connect_attempts: u32,
    /// Interval between readiness probes.
    pub connect_interval_secs: u64,
}

impl DatabaseConfig {
    pub fn connect_interval(&self) -> Duration {
        Duration::from_secs(self.connect_interval_secs)
    }
}

/// Token-signing configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub issuer: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// Runtime-mode configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub debug: bool,
    pub allowed_hosts: AllowedHosts,
}

/// Host allow-list parsed from `ALLOWED_HOSTS`.
///
/// Patterns: `*` matches everything; a leading dot matches the domain
/// and any subdomain (`.example.com` matches `example.com` and
/// `api.example.com`); anything else is an exact, case-insensitive match.
#[derive(Debug, Clone)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn parse(raw: &str) -> Self {
        let hosts: Vec<String> = raw
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        if hosts.is_empty() {
            Self(vec!["*".to_string()])
        } else {
            Self(hosts)
        }
    }

    /// Whether requests carrying `host` (port already stripped) are served.
    pub fn permits(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.0.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(bare) = pattern.strip_prefix('.') {
                host == bare || host.ends_with(pattern.as_str())
            } else {
                *pattern == host
            }
        })
    }
}

/// Flat settings mirroring the environment contract, prior to assembly
/// into the typed sections.
#[derive(Debug, Deserialize)]
struct RawSettings {
    db_host: String,
    db_name: String,
    db_user: String,
    db_pass: String,
    #[serde(default = "defaults::db_port")]
    db_port: u16,
    #[serde(default = "defaults::db_max_connections")]
    db_max_connections: u32,
    #[serde(default = "defaults::db_connect_attempts")]
    db_connect_attempts: u32,
    #[serde(default = "defaults::db_connect_interval_secs")]
    db_connect_interval_secs: u64,
    #[serde(default = "defaults::secret_key")]
    secret_key: String,
    #[serde(default)]
    debug: bool,
    #[serde(default = "defaults::allowed_hosts")]
    allowed_hosts: String,
    #[serde(default = "defaults::host")]
    host: String,
    #[serde(default = "defaults::port")]
    port: u16,
    #[serde(default = "defaults::access_token_minutes")]
    access_token_minutes: i64,
    #[serde(default = "defaults::refresh_token_days")]
    refresh_token_days: i64,
}

mod defaults {
    pub fn db_port() -> u16 {
        5432
    }
    pub fn db_max_connections() -> u32 {
        20
    }
    pub fn db_connect_attempts() -> u32 {
        10
    }
    pub fn db_connect_interval_secs() -> u64 {
        3
    }
    pub fn secret_key() -> String {
        super::DEV_SECRET_KEY.to_string()
    }
    pub fn allowed_hosts() -> String {
        "*".to_string()
    }
    pub fn host() -> String {
        "0.0.0.0".to_string()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn access_token_minutes() -> i64 {
        60
    }
    pub fn refresh_token_days() -> i64 {
        7
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Fails fast with a descriptive error when a required variable
    /// (`DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASS`) is missing or a
    /// value cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let raw: RawSettings = ConfigLoader::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSettings) -> Self {
        Self {
            server: ServerConfig {
                host: raw.host,
                port: raw.port,
            },
            database: DatabaseConfig {
                host: raw.db_host,
                port: raw.db_port,
                name: raw.db_name,
                user: raw.db_user,
                password: raw.db_pass,
                max_connections: raw.db_max_connections,
                connect_attempts: raw.db_connect_attempts,
                connect_interval_secs: raw.db_connect_interval_secs,
            },
            auth: AuthConfig {
                secret_key: raw.secret_key,
                issuer: "taskhub".to_string(),
                access_token_minutes: raw.access_token_minutes,
                refresh_token_days: raw.refresh_token_days,
            },
            runtime: RuntimeConfig {
                debug: raw.debug,
                allowed_hosts: AllowedHosts::parse(&raw.allowed_hosts),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawSettings {
        RawSettings {
            db_host: "db".to_string(),
            db_name: "taskhub".to_string(),
            db_user: "taskhub".to_string(),
            db_pass: "secret".to_string(),
            db_port: defaults::db_port(),
            db_max_connections: defaults::db_max_connections(),
            db_connect_attempts: defaults::db_connect_attempts(),
            db_connect_interval_secs: defaults::db_connect_interval_secs(),
            secret_key: defaults::secret_key(),
            debug: false,
            allowed_hosts: defaults::allowed_hosts(),
            host: defaults::host(),
            port: defaults::port(),
            access_token_minutes: defaults::access_token_minutes(),
            refresh_token_days: defaults::refresh_token_days(),
        }
    }

    #[test]
    fn test_defaults_assemble() {
        let config = Config::from_raw(minimal_raw());

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.connect_attempts, 10);
        assert_eq!(config.database.connect_interval(), Duration::from_secs(3));
        assert_eq!(config.auth.secret_key, DEV_SECRET_KEY);
        assert!(!config.runtime.debug);
    }

    #[test]
    fn test_allowed_hosts_wildcard() {
        let hosts = AllowedHosts::parse("*");
        assert!(hosts.permits("anything.example.com"));
        assert!(hosts.permits("localhost"));
    }

    #[test]
    fn test_allowed_hosts_exact_match() {
        let hosts = AllowedHosts::parse("api.example.com, localhost");
        assert!(hosts.permits("api.example.com"));
        assert!(hosts.permits("API.Example.Com"));
        assert!(hosts.permits("localhost"));
        assert!(!hosts.permits("evil.example.com"));
    }

    #[test]
    fn test_allowed_hosts_subdomain_pattern() {
        let hosts = AllowedHosts::parse(".example.com");
        assert!(hosts.permits("example.com"));
        assert!(hosts.permits("api.example.com"));
        assert!(!hosts.permits("example.org"));
        assert!(!hosts.permits("notexample.com"));
    }

    #[test]
    fn test_allowed_hosts_empty_falls_back_to_wildcard() {
        let hosts = AllowedHosts::parse("  , ");
        assert!(hosts.permits("anything"));
    }
}
