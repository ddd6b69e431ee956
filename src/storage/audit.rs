// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for contact disclosure.
//!
//! Every publish, acceptance, wrap, challenge and release decision is
//! appended to a daily JSONL file. Events never carry key material or
//! plaintext contacts.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoragePaths;
use crate::models::{TaskKey, WalletAddress};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Task mirror
    TaskPublished,
    TaskAccepted,
    TaskStatusChanged,

    // Key wrapping
    ContactKeyCreated,
    HelperWrapped,

    // Disclosure
    ChallengeIssued,
    ContactsReleased,
    ContactsDenied,

    // Profiles
    ProfileKeyRegistered,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Wallet that triggered the event (if known).
    pub address: Option<String>,
    /// Chain-scoped task key (`{chain_id}:{task_id}`).
    pub task: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            address: None,
            task: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_address(mut self, address: &WalletAddress) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn with_task(mut self, task: TaskKey) -> Self {
        self.task = Some(task.storage_key());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with an error code.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Append-only JSONL audit sink.
pub struct AuditLog {
    paths: StoragePaths,
    // Serializes appends so concurrent events never interleave within a line.
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            lock: Mutex::new(()),
        }
    }

    /// Append an event to its day's log file.
    pub fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(self.paths.audit_date_dir(&date))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.audit_events_file(&date))?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Log and swallow failures; auditing never blocks a request.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(&event) {
            tracing::warn!(error = %e, event_type = ?event.event_type, "Failed to write audit event");
        }
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    pub fn read_events(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let path = self.paths.audit_events_file(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }

    /// Events for one task on a given date.
    pub fn events_for_task(&self, task: TaskKey, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let key = task.storage_key();
        Ok(self
            .read_events(date)?
            .into_iter()
            .filter(|e| e.task.as_deref() == Some(key.as_str()))
            .collect())
    }
}
