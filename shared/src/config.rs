use tracing::warn;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials for the remote customer directory.
#[derive(Clone)]
pub struct ErplyCredentials {
    pub username: String,
    pub password: String,
    pub client_code: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ErplyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErplyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_code", &self.client_code)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub redis_addr: Option<String>,
    pub erply: ErplyCredentials,
    pub customer_cache_ttl_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_CACHE_TTL_SECS: u64 = 600;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let port = match var("APP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid {
                    name: "APP_PORT",
                    value: raw,
                })?,
            None => Self::DEFAULT_PORT,
        };

        let customer_cache_ttl_secs = match var("CUSTOMER_CACHE_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "CUSTOMER_CACHE_TTL_SECS",
                        value: raw,
                    });
                }
            },
            None => Self::DEFAULT_CACHE_TTL_SECS,
        };

        let redis_addr = var("REDIS_ADDR");
        if redis_addr.is_none() {
            warn!("REDIS_ADDR not set, customer cache will be process-local");
        }

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port,
            api_key: required("API_KEY")?,
            redis_addr,
            erply: ErplyCredentials {
                username: required("ERPLY_USER_NAME")?,
                password: required("ERPLY_USER_PASS")?,
                client_code: required("ERPLY_CLIENT_CODE")?,
                base_url: var("ERPLY_BASE_URL"),
            },
            customer_cache_ttl_secs,
            allowed_origins: var("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("API_KEY", "secret"),
        ("ERPLY_USER_NAME", "demo"),
        ("ERPLY_USER_PASS", "pass"),
        ("ERPLY_CLIENT_CODE", "104170"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.customer_cache_ttl_secs, 600);
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
        assert!(config.redis_addr.is_none());
        assert_eq!(config.erply.client_code, "104170");
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "8080"),
            ("REDIS_ADDR", "localhost:6379"),
            ("CUSTOMER_CACHE_TTL_SECS", "30"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.redis_addr.as_deref(), Some("localhost:6379"));
        assert_eq!(config.customer_cache_ttl_secs, 30);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_missing_api_key() {
        let vars: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != "API_KEY").collect();
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("API_KEY"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars.retain(|(k, _)| *k != "ERPLY_CLIENT_CODE");
        vars.push(("ERPLY_CLIENT_CODE", "  "));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ERPLY_CLIENT_CODE"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("APP_PORT", "eighty"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "APP_PORT", .. }));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CUSTOMER_CACHE_TTL_SECS", "0"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config.erply);
        assert!(!rendered.contains("pass\""));
        assert!(rendered.contains("<redacted>"));
    }
}
