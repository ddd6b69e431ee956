// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Messages a wallet signs to prove control of its address.
//!
//! Contact requests are signed over a challenge. Under the default
//! [`ChallengePolicy::Nonced`] policy the server issues a single-use message
//! that embeds a random nonce and an expiry:
//!
//! ```text
//! Request contacts for task 8
//! Nonce: 6f1c0e0f5b7e4d1f9b1a0a3c2d4e5f60
//! Expires: 2026-10-17T12:05:00Z
//! ```
//!
//! [`ChallengePolicy::Static`] accepts the fixed per-task message that older
//! clients sign.

use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::models::PendingChallenge;

/// Default lifetime of a nonced challenge.
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// How far a registration's `issuedAt` may be from the server clock.
pub const REGISTRATION_MAX_SKEW_SECS: i64 = 300;

const NONCE_PREFIX: &str = "Nonce: ";

/// How contact-request challenges are produced and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePolicy {
    /// `Request contacts for task {taskId}`, replayable.
    Static,
    /// Server-issued, single-use, expiring.
    Nonced { ttl: Duration },
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        ChallengePolicy::Nonced {
            ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
        }
    }
}

/// Parsed `CHALLENGE_MODE` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMode {
    Static,
    Nonced,
}

impl FromStr for ChallengeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(ChallengeMode::Static),
            "nonced" => Ok(ChallengeMode::Nonced),
            other => Err(format!("unknown challenge mode '{other}'")),
        }
    }
}

/// The fixed per-task message.
pub fn static_message(task_id: u64) -> String {
    format!("Request contacts for task {task_id}")
}

/// Build a fresh single-use challenge valid for `ttl` from `now`.
pub fn new_challenge(task_id: u64, now: DateTime<Utc>, ttl: Duration) -> PendingChallenge {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let expires_at = now + ttl;
    let message = format!(
        "{}\n{NONCE_PREFIX}{}\nExpires: {}",
        static_message(task_id),
        nonce,
        expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    PendingChallenge {
        nonce,
        message,
        expires_at,
    }
}

/// The nonce line of a nonced challenge message, if it has one.
pub fn challenge_nonce(message: &str) -> Option<&str> {
    message
        .lines()
        .find_map(|line| line.strip_prefix(NONCE_PREFIX))
        .filter(|nonce| !nonce.is_empty())
}

/// Message signed when registering an encryption public key.
///
/// `issued_at` is the client's RFC 3339 signing time. A stored key is only
/// replaced by a registration with a later `issued_at`.
pub fn registration_message(public_key: &str, address: &str, issued_at: &str) -> String {
    format!("Register encryption key {public_key} for {address} at {issued_at}")
}
