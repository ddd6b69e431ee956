// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives under `DATA_DIR`:
//!
//! - an embedded redb database holding tasks, contact keys, profiles and
//!   pending challenges
//! - a daily JSONL audit log
//!
//! Only ciphertext and wrapped keys are stored. Plaintext contacts and
//! recipients' secret keys never reach this layer.

pub mod audit;
pub mod database;
pub mod paths;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditLog};
pub use database::{
    ContactDatabase, DbError, DbResult, MAX_PENDING_CHALLENGES, MAX_PENDING_PER_REQUESTER,
};
pub use paths::StoragePaths;
