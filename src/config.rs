use std::env;
use std::str::FromStr;

use log::{info, warn};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "postboard-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set outside development mode")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Mongo,
    Memory,
}

/// Seed credentials for the first user of an empty database.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub is_dev: bool,
    pub storage: StorageKind,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub templates_glob: String,
    pub server_name: Option<String>,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let is_dev = env::var("RUST_ENV").unwrap_or_else(|_| "development".into()) == "development";

        let storage = match var_or("STORAGE", "mongo").as_str() {
            "mongo" | "mongodb" => StorageKind::Mongo,
            "memory" => StorageKind::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE",
                    value: other.to_string(),
                })
            }
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if is_dev => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminSeed {
                email: var_or("ADMIN_EMAIL", &format!("{}@localhost", username)),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: var_or("HOST", "127.0.0.1"),
            port: parse_var("PORT", 8080)?,
            is_dev,
            storage,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_database: var_or("MONGODB_DATABASE", "postboard"),
            templates_glob: var_or("TEMPLATES_GLOB", "src/templates/**/*"),
            server_name: env::var("SERVER_NAME").ok().filter(|s| !s.is_empty()),
            jwt_secret,
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 24)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            admin,
        })
    }

    /// Configuration used by the test suites: in-memory storage, the
    /// crate's own templates and a cheap bcrypt cost.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            is_dev: false,
            storage: StorageKind::Memory,
            mongodb_uri: String::new(),
            mongodb_database: String::new(),
            templates_glob: concat!(env!("CARGO_MANIFEST_DIR"), "/src/templates/**/*").to_string(),
            server_name: Some("localhost".to_string()),
            jwt_secret: "test-secret".to_string(),
            session_ttl_hours: 1,
            bcrypt_cost: 4,
            admin: None,
        }
    }

    pub fn env_mode(&self) -> &'static str {
        if self.is_dev {
            "development"
        } else {
            "production"
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => {
            info!("{} not set, using default", key);
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_reports_key() {
        env::set_var("POSTBOARD_TEST_PORT", "not-a-port");
        let err = parse_var::<u16>("POSTBOARD_TEST_PORT", 80).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for POSTBOARD_TEST_PORT: not-a-port");
        env::remove_var("POSTBOARD_TEST_PORT");
    }

    #[test]
    fn test_parse_var_default() {
        let value = parse_var::<u16>("POSTBOARD_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_for_tests_uses_memory() {
        let config = Config::for_tests();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.env_mode(), "production");
    }
}
