// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`AppConfig`] loaded once at startup. The config is immutable afterwards
//! and passed explicitly into the components that need it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HMAC-SHA256 signing secret (at least 32 bytes) | Required |
//! | `JWT_EXPIRE_HOURS` | Session token lifetime in hours | `24` |
//! | `DATA_DIR` | Directory for the identity database | In-memory store |
//! | `PASSWORD_HASH_MEMORY_KIB` | Argon2id memory cost | `19456` |
//! | `PASSWORD_HASH_ITERATIONS` | Argon2id passes | `2` |
//! | `WALLET_LOGIN_ENABLED` | Accept EIP-191 wallet logins | `true` |
//! | `REQUEST_TIMEOUT_SECS` | Per-request deadline | `30` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key for HTTPS | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::auth::HashParams;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the token signing secret.
///
/// Read once at startup; there is no runtime rotation. Changing it
/// invalidates every outstanding token.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRE_HOURS_ENV: &str = "JWT_EXPIRE_HOURS";

/// Environment variable name for the identity database directory.
///
/// When unset, identities live in process memory and are lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const PASSWORD_HASH_MEMORY_KIB_ENV: &str = "PASSWORD_HASH_MEMORY_KIB";
pub const PASSWORD_HASH_ITERATIONS_ENV: &str = "PASSWORD_HASH_ITERATIONS";
pub const WALLET_LOGIN_ENABLED_ENV: &str = "WALLET_LOGIN_ENABLED";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_EXPIRE_HOURS: i64 = 24;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Shortest accepted signing secret, in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for development
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// PEM files for serving HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub token_ttl: chrono::Duration,
    pub data_dir: Option<PathBuf>,
    pub hash_params: HashParams,
    pub wallet_login_enabled: bool,
    pub request_timeout: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }

        let expire_hours: i64 = parse_or(&var, JWT_EXPIRE_HOURS_ENV, DEFAULT_JWT_EXPIRE_HOURS)?;
        if expire_hours <= 0 {
            return Err(invalid(JWT_EXPIRE_HOURS_ENV, expire_hours, "must be positive"));
        }

        let defaults = HashParams::default();
        let hash_params = HashParams {
            memory_kib: parse_or(&var, PASSWORD_HASH_MEMORY_KIB_ENV, defaults.memory_kib)?,
            iterations: parse_or(&var, PASSWORD_HASH_ITERATIONS_ENV, defaults.iterations)?,
            parallelism: defaults.parallelism,
        };

        let timeout_secs: u64 =
            parse_or(&var, REQUEST_TIMEOUT_SECS_ENV, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(invalid(REQUEST_TIMEOUT_SECS_ENV, timeout_secs, "must be positive"));
        }

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let token_ttl = chrono::Duration::try_hours(expire_hours)
            .ok_or_else(|| invalid(JWT_EXPIRE_HOURS_ENV, expire_hours, "out of range"))?;

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|reason| invalid(LOG_FORMAT_ENV, &raw, reason))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&var, PORT_ENV, DEFAULT_PORT)?,
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl,
            data_dir: var(DATA_DIR_ENV).map(PathBuf::from),
            hash_params,
            wallet_login_enabled: parse_bool(&var, WALLET_LOGIN_ENABLED_ENV, true)?,
            request_timeout: Duration::from_secs(timeout_secs),
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|e: std::net::AddrParseError| invalid(HOST_ENV, &raw, e))
    }

    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T, V>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(name, &raw, e)),
        None => Ok(default),
    }
}

fn parse_bool<V>(var: &V, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    V: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(invalid(name, v, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
        assert!(config.data_dir.is_none());
        assert!(config.wallet_login_enabled);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.hash_params, HashParams::default());
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.jwt_secret_bytes(), SECRET.as_bytes());
    }

    #[test]
    fn secret_is_required_and_long() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(JWT_SECRET_ENV))));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "short")]),
            Err(ConfigError::WeakSecret)
        ));
    }

    #[test]
    fn secret_is_not_printed() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }

    #[test]
    fn overrides_parse() {
        let config = load(&[
            (JWT_SECRET_ENV, SECRET),
            (PORT_ENV, "9000"),
            (JWT_EXPIRE_HOURS_ENV, "2"),
            (DATA_DIR_ENV, "/var/lib/auth"),
            (WALLET_LOGIN_ENABLED_ENV, "false"),
            (PASSWORD_HASH_MEMORY_KIB_ENV, "65536"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.token_ttl, chrono::Duration::hours(2));
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/auth")));
        assert!(!config.wallet_login_enabled);
        assert_eq!(config.hash_params.memory_kib, 65536);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "eighty")]),
            Err(ConfigError::Invalid { var: PORT_ENV, .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (JWT_EXPIRE_HOURS_ENV, "0")]),
            Err(ConfigError::Invalid { var: JWT_EXPIRE_HOURS_ENV, .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (JWT_EXPIRE_HOURS_ENV, "9000000000000")]),
            Err(ConfigError::Invalid { var: JWT_EXPIRE_HOURS_ENV, .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (WALLET_LOGIN_ENABLED_ENV, "maybe")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (TLS_CERT_PATH_ENV, "/tls/cert.pem")]),
            Err(ConfigError::PartialTls)
        ));
    }
}
