// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Records mirrored from the marketplace contract and the contact material
//! stored alongside them.
//!
//! ## Wallet Address Type
//!
//! [`WalletAddress`] wraps an EVM address (0x-prefixed, 40 hex characters).
//! It is validated on construction and normalized to lowercase, so equality
//! is address equality regardless of checksum casing.
//!
//! ## Task Lifecycle
//!
//! ```text
//! Open ──accept──▶ InProgress ──▶ Submitted ──▶ Completed
//!   │                  │              │
//!   └──────────────────┴──────────────┴──────▶ Cancelled
//! ```
//!
//! The helper is unset while a task is `Open` and never changes once set.

use std::str::FromStr;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::crypto::{EncryptedPayload, SealedDek, WrappedKey};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Lowercase-normalized EVM wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "0x742d35cc6634c0532925a3b844bc9e7595f4ab12")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize an address.
    pub fn parse(value: &str) -> Result<Self, InvalidAddress> {
        let address =
            Address::from_str(value.trim()).map_err(|_| InvalidAddress(value.to_string()))?;
        Ok(Self::from(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        WalletAddress(alloy::hex::encode_prefixed(address.as_slice()))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid wallet address: {0}")]
pub struct InvalidAddress(pub String);

// =============================================================================
// Task Identity
// =============================================================================

/// Chain-scoped task identifier. Task ids are unique per chain only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub chain_id: u64,
    pub task_id: u64,
}

impl TaskKey {
    pub fn new(chain_id: u64, task_id: u64) -> Self {
        Self { chain_id, task_id }
    }

    /// Key used in every storage table: `{chain_id}:{task_id}`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.chain_id, self.task_id)
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.task_id)
    }
}

// =============================================================================
// Task
// =============================================================================

/// Task status as observed on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    Open,
    InProgress,
    Submitted,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Statuses that only make sense once a helper has accepted.
    pub fn requires_helper(self) -> bool {
        matches!(
            self,
            TaskStatus::InProgress | TaskStatus::Submitted | TaskStatus::Completed
        )
    }

    fn rank(self) -> u8 {
        match self {
            TaskStatus::Open => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Submitted => 2,
            TaskStatus::Completed => 3,
            TaskStatus::Cancelled => 3,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Submitted => "Submitted",
            TaskStatus::Completed => "Completed",
            TaskStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Rejected task transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskStateError {
    #[error("task is {0}, expected Open")]
    NotOpen(TaskStatus),

    #[error("task already has a helper")]
    HelperAlreadySet,

    #[error("creator cannot accept their own task")]
    CreatorCannotAccept,

    #[error("task is {0} and no longer accepts changes")]
    Closed(TaskStatus),

    #[error("task status {0} requires a helper")]
    HelperRequired(TaskStatus),

    #[error("cannot move task from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// A marketplace task mirrored from chain state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub chain_id: u64,
    pub task_id: u64,
    pub title: String,
    pub description: String,
    pub creator: WalletAddress,
    pub helper: Option<WalletAddress>,
    /// Reward in the token's smallest unit, decimal string.
    pub reward: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.chain_id, self.task_id)
    }

    /// Record `helper` accepting the task: Open → InProgress.
    pub fn accept(&mut self, helper: WalletAddress, now: DateTime<Utc>) -> Result<(), TaskStateError> {
        if self.helper.is_some() {
            return Err(TaskStateError::HelperAlreadySet);
        }
        if self.status != TaskStatus::Open {
            return Err(TaskStateError::NotOpen(self.status));
        }
        if helper == self.creator {
            return Err(TaskStateError::CreatorCannotAccept);
        }
        self.helper = Some(helper);
        self.status = TaskStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    /// Apply an externally observed status.
    ///
    /// Terminal states are final, status never moves backwards, and
    /// post-acceptance states require a helper.
    pub fn apply_status(&mut self, status: TaskStatus, now: DateTime<Utc>) -> Result<(), TaskStateError> {
        if status == self.status {
            return Ok(());
        }
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            return Err(TaskStateError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        if status.requires_helper() && self.helper.is_none() {
            return Err(TaskStateError::HelperRequired(status));
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Contact Material
// =============================================================================

/// Wrapped key material for one task. One record per task.
///
/// `helper_wrapped_dek` is written exactly once. `escrowed_dek` exists only
/// between creation and the helper wrap (or cancellation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactKeyRecord {
    pub chain_id: u64,
    pub task_id: u64,
    pub creator_wrapped_dek: WrappedKey,
    pub helper_wrapped_dek: Option<WrappedKey>,
    pub encrypted_payload: EncryptedPayload,
    pub escrowed_dek: Option<SealedDek>,
    pub created_at: DateTime<Utc>,
    pub helper_wrapped_at: Option<DateTime<Utc>>,
}

impl ContactKeyRecord {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.chain_id, self.task_id)
    }
}

/// Encryption public key registered for a wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub address: WalletAddress,
    /// 0x-hex compressed secp256k1 public key.
    pub encryption_public_key: String,
    pub updated_at: DateTime<Utc>,
}

/// Single-use signing challenge issued to a requester for a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChallenge {
    pub nonce: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}
