// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded contact database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `tasks`: `{chain_id}:{task_id}` → serialized Task
//! - `contact_keys`: `{chain_id}:{task_id}` → serialized ContactKeyRecord
//! - `profiles`: lowercase address → serialized Profile
//! - `challenges`: `{chain_id}:{task_id}|{address}|{nonce}` → serialized PendingChallenge
//! - `challenge_expiry`: expiry millis (big-endian) ++ challenge key → challenge key
//!
//! redb admits one write transaction at a time, so every check-then-write
//! below runs inside a single write transaction and cannot interleave with
//! another writer.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
    WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::crypto::WrappedKey;
use crate::models::{
    ContactKeyRecord, PendingChallenge, Profile, Task, TaskKey, WalletAddress,
};

// =============================================================================
// Table Definitions
// =============================================================================

const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");

const CONTACT_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("contact_keys");

const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

const CHALLENGES: TableDefinition<&str, &[u8]> = TableDefinition::new("challenges");

/// Index: expiry (big-endian millis) ++ challenge key → challenge key.
const CHALLENGE_EXPIRY: TableDefinition<&[u8], &str> = TableDefinition::new("challenge_expiry");

/// Unexpired challenges one requester may hold for one task.
pub const MAX_PENDING_PER_REQUESTER: usize = 5;

/// Pending challenges kept across all tasks and requesters.
pub const MAX_PENDING_CHALLENGES: u64 = 50_000;

/// Expired challenges removed per issuance.
pub const PURGE_BATCH: usize = 64;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A compare-and-set lost: the value was already written.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A bounded collection is full.
    #[error("capacity exceeded: {0}")]
    Capacity(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Key range `[start, end)` holding every challenge of one requester.
fn requester_range(task: &TaskKey, address: &WalletAddress) -> (String, String) {
    let task = task.storage_key();
    (format!("{task}|{address}|"), format!("{task}|{address}}}"))
}

fn challenge_key(task: &TaskKey, address: &WalletAddress, nonce: &str) -> String {
    format!("{}|{}|{}", task.storage_key(), address, nonce)
}

/// Expiry index keys sort by time: non-negative millis, big-endian.
fn expiry_prefix(millis: i64) -> [u8; 8] {
    (millis.max(0) as u64).to_be_bytes()
}

fn expiry_key(expires_at: DateTime<Utc>, challenge_key: &str) -> Vec<u8> {
    let mut key = expiry_prefix(expires_at.timestamp_millis()).to_vec();
    key.extend_from_slice(challenge_key.as_bytes());
    key
}

fn read_json<T, Tbl>(table: &Tbl, key: &str) -> DbResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

// =============================================================================
// ContactDatabase
// =============================================================================

/// Embedded ACID store for tasks and their contact material.
pub struct ContactDatabase {
    db: Database,
}

impl ContactDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TASKS)?;
            let _ = write_txn.open_table(CONTACT_KEYS)?;
            let _ = write_txn.open_table(PROFILES)?;
            let _ = write_txn.open_table(CHALLENGES)?;
            let _ = write_txn.open_table(CHALLENGE_EXPIRY)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` in a write transaction; commit on `Ok`, abort on `Err`.
    fn write<T, E>(&self, f: impl FnOnce(&WriteTransaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let write_txn = self.db.begin_write().map_err(DbError::from)?;
        match f(&write_txn) {
            Ok(value) => {
                write_txn.commit().map_err(DbError::from)?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort().map_err(DbError::from)?;
                Err(e)
            }
        }
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(TASKS)?;
        Ok(())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Insert a newly published task. Task ids are never reused per chain.
    pub fn insert_task(&self, task: &Task) -> DbResult<()> {
        let key = task.key().storage_key();
        let json = encode(task)?;
        self.write(|txn| {
            let mut table = txn.open_table(TASKS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(DbError::AlreadyExists(format!("Task {key}")));
            }
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn get_task(&self, key: &TaskKey) -> DbResult<Option<Task>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TASKS)?;
        read_json(&table, &key.storage_key())
    }

    /// Read-modify-write a task atomically.
    ///
    /// If the task ends up in a terminal status, any escrowed DEK for it is
    /// dropped in the same transaction.
    pub fn update_task<E>(
        &self,
        key: &TaskKey,
        f: impl FnOnce(&mut Task) -> Result<(), E>,
    ) -> Result<Task, E>
    where
        E: From<DbError>,
    {
        let storage_key = key.storage_key();
        self.write(|txn| {
            let mut tasks = txn.open_table(TASKS).map_err(DbError::from)?;
            let mut task: Task = read_json(&tasks, &storage_key)?
                .ok_or_else(|| DbError::NotFound(format!("Task {storage_key}")))?;

            f(&mut task)?;

            let json = encode(&task)?;
            tasks.insert(storage_key.as_str(), json.as_slice()).map_err(DbError::from)?;

            if task.status.is_terminal() {
                let mut keys = txn.open_table(CONTACT_KEYS).map_err(DbError::from)?;
                let record: Option<ContactKeyRecord> = read_json(&keys, &storage_key)?;
                if let Some(mut record) = record.filter(|r| r.escrowed_dek.is_some()) {
                    record.escrowed_dek = None;
                    let json = encode(&record)?;
                    keys.insert(storage_key.as_str(), json.as_slice())
                        .map_err(DbError::from)?;
                }
            }

            Ok(task)
        })
    }

    // =========================================================================
    // Contact keys
    // =========================================================================

    /// Insert the contact key for an existing task. At most one per task.
    pub fn insert_contact_key(&self, record: &ContactKeyRecord) -> DbResult<()> {
        let key = record.key().storage_key();
        let json = encode(record)?;
        self.write(|txn| {
            let tasks = txn.open_table(TASKS)?;
            if tasks.get(key.as_str())?.is_none() {
                return Err(DbError::NotFound(format!("Task {key}")));
            }

            let mut table = txn.open_table(CONTACT_KEYS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(DbError::AlreadyExists(format!("Contact key {key}")));
            }
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn get_contact_key(&self, key: &TaskKey) -> DbResult<Option<ContactKeyRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTACT_KEYS)?;
        read_json(&table, &key.storage_key())
    }

    /// Store the helper wrap if and only if none exists yet.
    ///
    /// Clears the escrowed DEK in the same write. A second caller observes
    /// `DbError::Conflict` and the stored wrap is left untouched.
    pub fn attach_helper_wrap(
        &self,
        key: &TaskKey,
        wrapped: &WrappedKey,
        now: DateTime<Utc>,
    ) -> DbResult<ContactKeyRecord> {
        let storage_key = key.storage_key();
        self.write(|txn| {
            let mut table = txn.open_table(CONTACT_KEYS)?;
            let mut record: ContactKeyRecord = read_json(&table, &storage_key)?
                .ok_or_else(|| DbError::NotFound(format!("Contact key {storage_key}")))?;

            if record.helper_wrapped_dek.is_some() {
                return Err(DbError::Conflict(format!(
                    "Helper wrap for {storage_key} already stored"
                )));
            }

            record.helper_wrapped_dek = Some(wrapped.clone());
            record.helper_wrapped_at = Some(now);
            record.escrowed_dek = None;

            let json = encode(&record)?;
            table.insert(storage_key.as_str(), json.as_slice())?;
            Ok(record)
        })
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Insert or replace the profile for an address.
    pub fn put_profile(&self, profile: &Profile) -> DbResult<()> {
        let json = encode(profile)?;
        self.write(|txn| {
            let mut table = txn.open_table(PROFILES)?;
            table.insert(profile.address.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Store `profile` only if it is newer than the stored one.
    ///
    /// Fails with `DbError::Conflict` when the stored `updated_at` is not
    /// older, so an old registration cannot be written back over a rotation.
    pub fn put_profile_if_newer(&self, profile: &Profile) -> DbResult<()> {
        let json = encode(profile)?;
        self.write(|txn| {
            let mut table = txn.open_table(PROFILES)?;
            let current: Option<Profile> = read_json(&table, profile.address.as_str())?;
            if current.is_some_and(|c| c.updated_at >= profile.updated_at) {
                return Err(DbError::Conflict(format!(
                    "Profile {} has a newer registration",
                    profile.address
                )));
            }
            table.insert(profile.address.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn get_profile(&self, address: &WalletAddress) -> DbResult<Option<Profile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;
        read_json(&table, address.as_str())
    }

    // =========================================================================
    // Challenges
    // =========================================================================

    /// Store a challenge under its nonce.
    ///
    /// Earlier challenges for the same requester stay valid, so a third party
    /// issuing in someone else's name cannot invalidate what they are about
    /// to sign. At most [`MAX_PENDING_PER_REQUESTER`] unexpired challenges per
    /// `(task, address)` and [`MAX_PENDING_CHALLENGES`] overall are kept;
    /// beyond that issuance fails with `DbError::Capacity`. Up to
    /// [`PURGE_BATCH`] expired challenges are removed in the same write.
    pub fn put_challenge(
        &self,
        task: &TaskKey,
        address: &WalletAddress,
        challenge: &PendingChallenge,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let (start, end) = requester_range(task, address);
        let key = format!("{start}{}", challenge.nonce);
        let json = encode(challenge)?;
        self.write(|txn| {
            let mut table = txn.open_table(CHALLENGES)?;
            let mut expiry = txn.open_table(CHALLENGE_EXPIRY)?;

            purge_expired(&mut table, &mut expiry, now)?;

            let mut live = 0;
            for entry in table.range(start.as_str()..end.as_str())? {
                let (_, value) = entry?;
                let pending: PendingChallenge = serde_json::from_slice(value.value())?;
                if pending.expires_at > now {
                    live += 1;
                }
            }
            if live >= MAX_PENDING_PER_REQUESTER {
                return Err(DbError::Capacity(format!("Pending challenges for {start}")));
            }
            if table.len()? >= MAX_PENDING_CHALLENGES {
                return Err(DbError::Capacity("Pending challenges".into()));
            }

            table.insert(key.as_str(), json.as_slice())?;
            expiry.insert(expiry_key(challenge.expires_at, &key).as_slice(), key.as_str())?;
            Ok(())
        })
    }

    pub fn get_challenge(
        &self,
        task: &TaskKey,
        address: &WalletAddress,
        nonce: &str,
    ) -> DbResult<Option<PendingChallenge>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHALLENGES)?;
        read_json(&table, &challenge_key(task, address, nonce))
    }

    /// Consume the challenge with `nonce`. Returns `false` if it was already
    /// consumed or purged.
    pub fn take_challenge(
        &self,
        task: &TaskKey,
        address: &WalletAddress,
        nonce: &str,
    ) -> DbResult<bool> {
        let key = challenge_key(task, address, nonce);
        self.write(|txn| {
            let mut table = txn.open_table(CHALLENGES)?;
            let removed: Option<PendingChallenge> = match table.remove(key.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            let Some(pending) = removed else {
                return Ok(false);
            };

            let mut expiry = txn.open_table(CHALLENGE_EXPIRY)?;
            expiry.remove(expiry_key(pending.expires_at, &key).as_slice())?;
            Ok(true)
        })
    }
}

/// Remove up to [`PURGE_BATCH`] challenges that expired at or before `now`,
/// oldest first.
fn purge_expired(
    challenges: &mut Table<'_, &'static str, &'static [u8]>,
    expiry: &mut Table<'_, &'static [u8], &'static str>,
    now: DateTime<Utc>,
) -> DbResult<usize> {
    let bound = expiry_prefix(now.timestamp_millis() + 1);
    let mut stale = Vec::new();
    for entry in expiry.range(..bound.as_slice())?.take(PURGE_BATCH) {
        let (index_key, challenge_key) = entry?;
        stale.push((index_key.value().to_vec(), challenge_key.value().to_string()));
    }
    for (index_key, challenge_key) in &stale {
        expiry.remove(index_key.as_slice())?;
        challenges.remove(challenge_key.as_str())?;
    }
    if !stale.is_empty() {
        tracing::debug!(purged = stale.len(), "Expired challenges purged");
    }
    Ok(stale.len())
}

// =============================================================================
// Tests
// =============================================================================
