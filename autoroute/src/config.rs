//! Environment-driven configuration.

use std::fmt;
use std::time::Duration;

/// Loads a `.env` file from the working directory, if there is one.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing environment variable {}", key),
            ConfigError::Invalid(key, value) => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix of the generated API group.
    pub api_prefix: String,
    pub request_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_prefix: "/api".to_string(),
            request_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `API_PREFIX` and `REQUEST_TIMEOUT_SECS`,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => defaults.port,
        };
        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS", raw))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            api_prefix: lookup("API_PREFIX").unwrap_or(defaults.api_prefix),
            request_timeout,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("API_PREFIX", "/v1"),
            ("REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.api_prefix, "/v1");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("PORT", "http".to_string()));
        assert_eq!(err.to_string(), "invalid value for PORT: \"http\"");
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        // SAFETY: serialized with the other environment tests.
        unsafe {
            std::env::set_var("PORT", "4001");
        }
        let config = ServerConfig::from_env().unwrap();
        unsafe {
            std::env::remove_var("PORT");
        }
        assert_eq!(config.port, 4001);
    }
}
