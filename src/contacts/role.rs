// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::WrappedKey;
use crate::models::{ContactKeyRecord, Task, WalletAddress};

/// The capacity in which an address may read a task's contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    Creator,
    Helper,
}

impl ContactRole {
    /// Resolve `address` against the task's parties. `None` for outsiders.
    pub fn resolve(task: &Task, address: &WalletAddress) -> Option<Self> {
        if &task.creator == address {
            Some(ContactRole::Creator)
        } else if task.helper.as_ref() == Some(address) {
            Some(ContactRole::Helper)
        } else {
            None
        }
    }

    /// This role's wrapped DEK, if it has been written.
    pub fn wrapped_key<'a>(&self, record: &'a ContactKeyRecord) -> Option<&'a WrappedKey> {
        match self {
            ContactRole::Creator => Some(&record.creator_wrapped_dek),
            ContactRole::Helper => record.helper_wrapped_dek.as_ref(),
        }
    }
}
