// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values, and
//! loads them once at startup. Nothing here is read again after `main` has
//! built the node client and relay engine.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BASE64_CERT` | LND TLS certificate, base64 encoded PEM | One of this or `CERT_PATH` |
//! | `CERT_PATH` | Path to the LND `tls.cert` file | One of this or `BASE64_CERT` |
//! | `BASE64_MACAROON` | LND macaroon, base64 encoded | One of this or `MACAROON_PATH` |
//! | `MACAROON_PATH` | Path to the binary macaroon file | One of this or `BASE64_MACAROON` |
//! | `SOCKET` | LND REST gateway `host:port` | Required |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `4545` |
//! | `TLS_CERT_PATH` | PEM certificate chain for HTTPS | Plain HTTP when unset |
//! | `TLS_KEY_PATH` | PEM private key for HTTPS | Plain HTTP when unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `RELAY_PREMIUM_MTOKENS` | Fixed margin added to every hold invoice | `2000` |
//! | `RELAY_BASE_FEE_MTOKENS` | Base fee when no channel policy applies | `1000` |
//! | `RELAY_FEE_RATE_PPM` | Fee rate when no channel policy applies | `2500` |

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use base64ct::{Base64, Encoding};

use crate::lnd::LndConfig;
use crate::relay::RelayPolicy;

pub const BASE64_CERT_ENV: &str = "BASE64_CERT";
pub const CERT_PATH_ENV: &str = "CERT_PATH";
pub const BASE64_MACAROON_ENV: &str = "BASE64_MACAROON";
pub const MACAROON_PATH_ENV: &str = "MACAROON_PATH";
pub const SOCKET_ENV: &str = "SOCKET";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Environment variable name for the log output format.
///
/// `json` emits one JSON object per line; anything else is human readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const PREMIUM_MTOKENS_ENV: &str = "RELAY_PREMIUM_MTOKENS";
pub const BASE_FEE_MTOKENS_ENV: &str = "RELAY_BASE_FEE_MTOKENS";
pub const FEE_RATE_PPM_ENV: &str = "RELAY_FEE_RATE_PPM";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4545;

/// Errors raised while loading configuration. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Expected BASE64_CERT or CERT_PATH to authenticate to LND")]
    MissingCert,

    #[error("Expected BASE64_MACAROON or MACAROON_PATH to authenticate to LND")]
    MissingMacaroon,

    #[error("Expected SOCKET to authenticate to LND")]
    MissingSocket,

    #[error("{name} is not valid base64: {reason}")]
    InvalidBase64 { name: &'static str, reason: String },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,

    #[error("RELAY_PREMIUM_MTOKENS must be greater than zero")]
    ZeroPremium,
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::MissingCert => "ExpectedTlsCertToGetAuthenticatedLnd",
            ConfigError::MissingMacaroon => "ExpectedMacaroonToGetAuthenticatedLnd",
            ConfigError::MissingSocket => "ExpectedSocketToGetAuthenticatedLnd",
            ConfigError::InvalidBase64 { .. } => "InvalidBase64Credential",
            ConfigError::Unreadable { .. } => "UnreadableCredentialFile",
            ConfigError::InvalidValue { .. } => "InvalidConfigurationValue",
            ConfigError::IncompleteTls => "ExpectedTlsCertAndKeyTogether",
            ConfigError::ZeroPremium => "ExpectedPositiveRelayPremium",
        }
    }
}

/// Reads the process environment. Loaders take any lookup function so
/// tests can supply a map instead.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Non-empty, trimmed value of `name`.
fn env_value(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(env: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    env_value(env, name).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env_value(env, name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

/// Inline base64 wins over a file path.
fn credential(
    env: &impl Fn(&str) -> Option<String>,
    base64_name: &'static str,
    path_name: &str,
    missing: ConfigError,
) -> Result<Vec<u8>, ConfigError> {
    if let Some(encoded) = env_value(env, base64_name) {
        return Base64::decode_vec(&encoded).map_err(|e| ConfigError::InvalidBase64 {
            name: base64_name,
            reason: e.to_string(),
        });
    }

    let path = env_value(env, path_name).map(PathBuf::from).ok_or(missing)?;
    fs::read(&path).map_err(|source| ConfigError::Unreadable { path, source })
}

/// Node connection settings.
pub fn load_lnd_config(env: &impl Fn(&str) -> Option<String>) -> Result<LndConfig, ConfigError> {
    let has_cert = env_value(env, BASE64_CERT_ENV).is_some() || env_value(env, CERT_PATH_ENV).is_some();
    if !has_cert {
        return Err(ConfigError::MissingCert);
    }
    let has_macaroon =
        env_value(env, BASE64_MACAROON_ENV).is_some() || env_value(env, MACAROON_PATH_ENV).is_some();
    if !has_macaroon {
        return Err(ConfigError::MissingMacaroon);
    }
    let socket = env_value(env, SOCKET_ENV).ok_or(ConfigError::MissingSocket)?;

    let cert_pem = credential(env, BASE64_CERT_ENV, CERT_PATH_ENV, ConfigError::MissingCert)?;
    let macaroon = credential(
        env,
        BASE64_MACAROON_ENV,
        MACAROON_PATH_ENV,
        ConfigError::MissingMacaroon,
    )?;

    Ok(LndConfig::new(socket, cert_pem, macaroon))
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Certificate chain and key paths, when serving HTTPS.
    pub tls: Option<(PathBuf, PathBuf)>,
}

pub fn load_server_config(env: &impl Fn(&str) -> Option<String>) -> Result<ServerConfig, ConfigError> {
    let host = env_or_default(env, HOST_ENV, DEFAULT_HOST);
    let port: u16 = env_parsed(env, PORT_ENV, DEFAULT_PORT)?;
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name: HOST_ENV,
            value: host,
        })?;

    let tls = match (
        env_value(env, TLS_CERT_PATH_ENV),
        env_value(env, TLS_KEY_PATH_ENV),
    ) {
        (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
        (None, None) => None,
        _ => return Err(ConfigError::IncompleteTls),
    };

    Ok(ServerConfig { addr, tls })
}

/// Relay policy with fee overrides applied.
pub fn load_relay_policy(env: &impl Fn(&str) -> Option<String>) -> Result<RelayPolicy, ConfigError> {
    let defaults = RelayPolicy::default();
    let policy = RelayPolicy {
        premium_mtokens: env_parsed(env, PREMIUM_MTOKENS_ENV, defaults.premium_mtokens)?,
        base_fee_mtokens: env_parsed(env, BASE_FEE_MTOKENS_ENV, defaults.base_fee_mtokens)?,
        fee_rate: env_parsed(env, FEE_RATE_PPM_ENV, defaults.fee_rate)?,
        ..defaults
    };

    if policy.premium_mtokens == 0 {
        return Err(ConfigError::ZeroPremium);
    }
    Ok(policy)
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

pub fn log_format(env: &impl Fn(&str) -> Option<String>) -> LogFormat {
    match env_value(env, LOG_FORMAT_ENV).as_deref() {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}
