// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout for persistent storage.
//!
//! ```text
//! {DATA_DIR}/
//!   contacts.redb           # Tasks, contact keys, profiles, challenges
//!   audit/
//!     {date}/events.jsonl   # Daily audit logs
//! ```

use std::path::{Path, PathBuf};

/// Default data directory when `DATA_DIR` is unset.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The embedded contact database file.
    pub fn database(&self) -> PathBuf {
        self.root.join("contacts.redb")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
