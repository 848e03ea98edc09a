//! Service configuration
//!
//! Read once at startup and passed into the components that need it; no
//! module-level mutable state.

use std::env;
use std::time::Duration;

use crate::ledger::DEFAULT_STORAGE_TIMEOUT;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub port: u16,
    pub storage_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = get("DATABASE_URL").unwrap_or_else(|| "sqlite:bank.db".to_string());

        let port = get("PORT")
            .or_else(|| get("API_PORT"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let storage_timeout = get("STORAGE_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STORAGE_TIMEOUT);

        Self {
            database_url,
            port,
            storage_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config.database_url, "sqlite:bank.db");
        assert_eq!(config.port, 8000);
        assert_eq!(config.storage_timeout, DEFAULT_STORAGE_TIMEOUT);
    }

    #[test]
    fn test_reads_overrides() {
        let config = ServiceConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite:other.db".to_string()),
            "API_PORT" => Some("9100".to_string()),
            "STORAGE_TIMEOUT_SECS" => Some("2".to_string()),
            _ => None,
        });
        assert_eq!(config.database_url, "sqlite:other.db");
        assert_eq!(config.port, 9100);
        assert_eq!(config.storage_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = ServiceConfig::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            "STORAGE_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8000);
        assert_eq!(config.storage_timeout, DEFAULT_STORAGE_TIMEOUT);
    }
}
