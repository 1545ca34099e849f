//! Server settings loaded from the environment
//!
//! | Variable                   | Default       |
//! |----------------------------|---------------|
//! | `APP_ENV`                  | `development` (falls back to `NODE_ENV`) |
//! | `BIND_ADDR`                | `0.0.0.0`     |
//! | `PORT`                     | `5000`        |
//! | `DATABASE_URL`             | unset         |
//! | `DATABASE_MAX_CONNECTIONS` | `5`           |
//! | `JWT_SECRET`               | `dev-secret` (required in production) |
//! | `JWT_EXPIRES_IN`           | `2h`          |
//! | `CORS_ORIGIN`              | `*`           |
//! | `UPLOAD_DIR`               | `uploads`     |
//! | `MAX_FILE_SIZE_MB`         | `5`           |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::store::pool::DEFAULT_MAX_CONNECTIONS;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const DEFAULT_MAX_FILE_SIZE_MB: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set when APP_ENV=production")]
    MissingInProduction { var: &'static str },

    #[error("invalid {var} value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Deployment environment. Anything other than `production` exposes error
/// detail in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::Invalid {
                var: "APP_ENV",
                value: s.to_owned(),
                reason: "expected development, test or production",
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub cors_origin: String,
    pub upload_dir: PathBuf,
    pub max_file_size_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            jwt_secret: DEV_JWT_SECRET.to_owned(),
            jwt_expires_in: DEFAULT_TOKEN_TTL,
            cors_origin: "*".to_owned(),
            upload_dir: PathBuf::from("uploads"),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

impl Settings {
    /// Create settings from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create settings from an arbitrary key lookup (for testing)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match var("APP_ENV").or_else(|| var("NODE_ENV")) {
            Some(v) => v.parse()?,
            None => defaults.environment,
        };

        let host: IpAddr = match var("BIND_ADDR") {
            Some(v) => parse_var("BIND_ADDR", &v, "expected an IP address")?,
            None => defaults.bind_addr.ip(),
        };
        let port: u16 = match var("PORT") {
            Some(v) => parse_var("PORT", &v, "expected a port number")?,
            None => defaults.bind_addr.port(),
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(v) => v,
            None if environment.is_production() => {
                return Err(ConfigError::MissingInProduction { var: "JWT_SECRET" })
            }
            None => defaults.jwt_secret,
        };

        let jwt_expires_in = match var("JWT_EXPIRES_IN") {
            Some(v) => parse_duration(&v).ok_or(ConfigError::Invalid {
                var: "JWT_EXPIRES_IN",
                value: v.clone(),
                reason: "expected seconds or <n>s, <n>m, <n>h, <n>d",
            })?,
            None => defaults.jwt_expires_in,
        };

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(v) => parse_var("DATABASE_MAX_CONNECTIONS", &v, "expected a positive integer")?,
            None => defaults.database_max_connections,
        };

        let max_file_size_mb = match var("MAX_FILE_SIZE_MB") {
            Some(v) => parse_var("MAX_FILE_SIZE_MB", &v, "expected a whole number of megabytes")?,
            None => defaults.max_file_size_mb,
        };

        Ok(Self {
            environment,
            bind_addr: SocketAddr::new(host, port),
            database_url: var("DATABASE_URL"),
            database_max_connections,
            jwt_secret,
            jwt_expires_in,
            cors_origin: var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_file_size_mb,
        })
    }

    /// Upload size limit in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Whether error responses may carry debug detail
    pub fn expose_error_detail(&self) -> bool {
        !self.environment.is_production()
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str, reason: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_owned(),
        reason,
    })
}

/// Parse a token lifetime such as `90`, `30s`, `15m`, `2h` or `7d`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => value.split_at(idx),
        None => (value, "s"),
    };
    let n: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    n.checked_mul(multiplier).filter(|s| *s > 0).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.environment, Environment::Development);
        assert_eq!(s.bind_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(s.jwt_secret, "dev-secret");
        assert_eq!(s.jwt_expires_in, Duration::from_secs(7200));
        assert_eq!(s.cors_origin, "*");
        assert_eq!(s.max_upload_bytes(), 5 * 1024 * 1024);
        assert!(s.database_url.is_none());
        assert!(s.expose_error_detail());
    }

    #[test]
    fn production_requires_secret() {
        assert!(matches!(
            settings(&[("APP_ENV", "production")]),
            Err(ConfigError::MissingInProduction { var: "JWT_SECRET" })
        ));

        let s = settings(&[("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert!(!s.expose_error_detail());
    }

    #[test]
    fn node_env_is_a_fallback() {
        let s = settings(&[("NODE_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(s.environment, Environment::Production);
        assert!(!s.expose_error_detail());

        let s = settings(&[("APP_ENV", "test"), ("NODE_ENV", "production")]).unwrap();
        assert_eq!(s.environment, Environment::Test);
    }

    #[test]
    fn overrides() {
        let s = settings(&[
            ("PORT", "8080"),
            ("BIND_ADDR", "127.0.0.1"),
            ("JWT_EXPIRES_IN", "15m"),
            ("MAX_FILE_SIZE_MB", "1"),
            ("UPLOAD_DIR", "/tmp/docs"),
            ("DATABASE_URL", "postgres://localhost/bursar"),
        ])
        .unwrap();
        assert_eq!(s.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(s.jwt_expires_in, Duration::from_secs(900));
        assert_eq!(s.max_upload_bytes(), 1024 * 1024);
        assert_eq!(s.upload_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/bursar"));
    }

    #[test]
    fn bad_port_is_error() {
        assert!(matches!(
            settings(&[("PORT", "http")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("2w"), None);
        assert_eq!(parse_duration("h"), None);
    }
}
