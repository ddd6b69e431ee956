// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the database and audit log | `/data` |
//! | `CHAIN_ID` | Chain whose tasks are mirrored | `43113` (Avalanche Fuji) |
//! | `CHALLENGE_MODE` | `nonced` or `static` contact challenges | `nonced` |
//! | `CHALLENGE_TTL_SECS` | Lifetime of a nonced challenge | `300` |
//! | `CONTACT_ESCROW_KEY` | 32-byte hex key sealing escrowed DEKs | ephemeral (warns) |
//! | `INTERNAL_API_TOKEN` | Bearer token for indexer endpoints | unset (endpoints closed) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use crate::auth::challenge::DEFAULT_CHALLENGE_TTL_SECS;
use crate::auth::{ChallengeMode, ChallengePolicy};
use crate::crypto::EscrowKey;
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const CHALLENGE_MODE_ENV: &str = "CHALLENGE_MODE";
pub const CHALLENGE_TTL_ENV: &str = "CHALLENGE_TTL_SECS";

/// Environment variable name for the escrow key.
///
/// Without it, DEKs escrowed before a restart can no longer be wrapped for
/// a helper.
pub const ESCROW_KEY_ENV: &str = "CONTACT_ESCROW_KEY";

pub const INTERNAL_TOKEN_ENV: &str = "INTERNAL_API_TOKEN";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Avalanche Fuji testnet.
pub const DEFAULT_CHAIN_ID: u64 = 43113;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

/// Fully parsed runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub chain_id: u64,
    pub challenge_policy: ChallengePolicy,
    /// `None` means generate an ephemeral key at startup.
    pub escrow_key: Option<EscrowKey>,
    pub internal_api_token: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = match get(HOST_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(HOST_ENV, e))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match get(PORT_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(PORT_ENV, e))?,
            None => 8080,
        };
        let data_dir: PathBuf = get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()).into();
        let chain_id = match get(CHAIN_ID_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(CHAIN_ID_ENV, e))?,
            None => DEFAULT_CHAIN_ID,
        };

        let mode = match get(CHALLENGE_MODE_ENV) {
            Some(v) => v.parse().map_err(|e| invalid(CHALLENGE_MODE_ENV, e))?,
            None => ChallengeMode::Nonced,
        };
        let ttl_secs: i64 = match get(CHALLENGE_TTL_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(CHALLENGE_TTL_ENV, e))?,
            None => DEFAULT_CHALLENGE_TTL_SECS,
        };
        if ttl_secs <= 0 {
            return Err(invalid(CHALLENGE_TTL_ENV, "must be positive"));
        }
        let challenge_policy = match mode {
            ChallengeMode::Static => ChallengePolicy::Static,
            ChallengeMode::Nonced => ChallengePolicy::Nonced {
                ttl: Duration::seconds(ttl_secs),
            },
        };

        let escrow_key = get(ESCROW_KEY_ENV)
            .map(|v| EscrowKey::from_hex(&v).map_err(|e| invalid(ESCROW_KEY_ENV, e)))
            .transpose()?;

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(other) => return Err(invalid(LOG_FORMAT_ENV, format!("unknown format '{other}'"))),
            None => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            chain_id,
            challenge_policy,
            escrow_key,
            internal_api_token: get(INTERNAL_TOKEN_ENV),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
