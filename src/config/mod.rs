use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

/// Keys whose presence is always reported by `/system/health`
pub const BASE_REQUIRED_KEYS: [&str; 2] = ["DATABASE_URL", "SESSION_SECRET"];

/// Longest session lifetime accepted from configuration (one year)
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    /// Presence of each required configuration key, captured at startup
    pub required: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub session_secret: Option<String>,
    pub session_cookie_name: String,
    pub session_ttl_hours: u64,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific keys
        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };
        config.apply_overrides(&get);
        config
    }

    fn apply_overrides<F>(&mut self, get: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = get("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("ACCOUNT_API_PORT").or_else(|| get("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        self.database.url = get("DATABASE_URL");
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = get("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        self.security.session_secret = get("SESSION_SECRET");
        if let Some(v) = get("SESSION_COOKIE_NAME") {
            self.security.session_cookie_name = v;
        }
        if let Some(v) = get("SESSION_TTL_HOURS") {
            match v.trim().parse::<u64>() {
                Ok(hours) if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) => {
                    self.security.session_ttl_hours = hours;
                }
                _ => tracing::warn!(
                    "Ignoring SESSION_TTL_HOURS={}; expected 1..={}, keeping {}h",
                    v,
                    MAX_SESSION_TTL_HOURS,
                    self.security.session_ttl_hours
                ),
            }
        }
        if let Some(v) = get("SESSION_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Some(v) = get("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        let extra = get("REQUIRED_ENV_KEYS").map(|v| split_list(&v)).unwrap_or_default();
        self.required = BASE_REQUIRED_KEYS
            .iter()
            .map(|key| key.to_string())
            .chain(extra)
            .map(|key| {
                let present = get(key.as_str()).is_some();
                (key, present)
            })
            .collect();
    }

    /// Names of required keys that were not provided
    pub fn missing_keys(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                session_secret: None,
                session_cookie_name: "session".to_string(),
                session_ttl_hours: 24 * 7, // 1 week
                cookie_secure: false,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            required: BTreeMap::new(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                session_secret: None,
                session_cookie_name: "session".to_string(),
                session_ttl_hours: 24,
                cookie_secure: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            required: BTreeMap::new(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 3,
            },
            security: SecurityConfig {
                session_secret: None,
                session_cookie_name: "__Host-session".to_string(),
                session_ttl_hours: 12,
                cookie_secure: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            required: BTreeMap::new(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
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
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 3000);
        assert!(!config.security.cookie_secure);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "prod")]));
        assert_eq!(config.environment, Environment::Production);
        assert!(config.security.cookie_secure);
        assert_eq!(config.security.session_ttl_hours, 12);
    }

    #[test]
    fn reports_presence_of_required_keys() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("SESSION_SECRET", "  "),
            ("REQUIRED_ENV_KEYS", "MAIL_API_KEY, STORAGE_BUCKET,"),
            ("MAIL_API_KEY", "key"),
        ]));

        assert_eq!(config.required.get("DATABASE_URL"), Some(&true));
        assert_eq!(config.required.get("SESSION_SECRET"), Some(&false));
        assert_eq!(config.required.get("MAIL_API_KEY"), Some(&true));
        assert_eq!(config.required.get("STORAGE_BUCKET"), Some(&false));
        assert_eq!(config.required.len(), 4);
        assert_eq!(config.missing_keys(), vec!["SESSION_SECRET", "STORAGE_BUCKET"]);
        assert!(config.security.session_secret.is_none());
    }

    #[test]
    fn applies_overrides_and_ignores_unparseable_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ACCOUNT_API_PORT", "9090"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("SESSION_COOKIE_NAME", "sid"),
            ("SECURITY_CORS_ORIGINS", "https://a.test, https://b.test"),
        ]));

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.security.session_cookie_name, "sid");
        assert_eq!(config.security.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn out_of_range_session_ttl_keeps_preset() {
        for bad in ["0", "-5", "9999999999999", "18446744073709551615", "forever"] {
            let config = AppConfig::from_lookup(lookup(&[("SESSION_TTL_HOURS", bad)]));
            assert_eq!(config.security.session_ttl_hours, 24 * 7, "value {}", bad);
        }

        let config = AppConfig::from_lookup(lookup(&[("SESSION_TTL_HOURS", "8760")]));
        assert_eq!(config.security.session_ttl_hours, MAX_SESSION_TTL_HOURS);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://user:hunter2@db/app"),
            ("SESSION_SECRET", "topsecret"),
        ]));
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("topsecret"));
    }
}
