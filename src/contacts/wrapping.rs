// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key Wrapping Service.
//!
//! Mints one DEK per task, encrypts the contact payload with it and wraps it
//! for each party's registered public key. The plaintext DEK exists only for
//! the duration of a call; between creation and the helper wrap it is held
//! sealed under the escrow key. The escrow is dropped once the helper wrap is
//! stored or the task reaches a terminal status.

use chrono::{DateTime, Utc};

use super::ContactError;
use crate::crypto::{encrypt_payload, wrap_key, DataKey, EncryptionPublicKey, EscrowKey};
use crate::models::{ContactKeyRecord, TaskKey, TaskStateError, WalletAddress};
use crate::storage::{ContactDatabase, DbError};

pub struct KeyWrappingService<'a> {
    db: &'a ContactDatabase,
    escrow: &'a EscrowKey,
    chain_id: u64,
}

impl<'a> KeyWrappingService<'a> {
    pub fn new(db: &'a ContactDatabase, escrow: &'a EscrowKey, chain_id: u64) -> Self {
        Self {
            db,
            escrow,
            chain_id,
        }
    }

    fn key(&self, task_id: u64) -> TaskKey {
        TaskKey::new(self.chain_id, task_id)
    }

    /// Registered encryption public key for `address`.
    pub fn public_key_for(&self, address: &WalletAddress) -> Result<EncryptionPublicKey, ContactError> {
        let profile = self
            .db
            .get_profile(address)?
            .ok_or_else(|| ContactError::MissingPublicKey(address.clone()))?;
        EncryptionPublicKey::from_hex(&profile.encryption_public_key)
            .map_err(|_| ContactError::MissingPublicKey(address.clone()))
    }

    /// Encrypt `contacts` under a fresh DEK wrapped for `creator_key`.
    pub fn create_contact_key(
        &self,
        task_id: u64,
        contacts: &str,
        creator_key: &EncryptionPublicKey,
        now: DateTime<Utc>,
    ) -> Result<ContactKeyRecord, ContactError> {
        let key = self.key(task_id);
        if contacts.trim().is_empty() {
            return Err(ContactError::InvalidInput("contacts must not be empty".into()));
        }

        let task = self
            .db
            .get_task(&key)?
            .ok_or(ContactError::TaskNotFound(key))?;
        if task.status.is_terminal() {
            return Err(TaskStateError::Closed(task.status).into());
        }

        let dek = DataKey::generate();
        let record = ContactKeyRecord {
            chain_id: key.chain_id,
            task_id: key.task_id,
            creator_wrapped_dek: wrap_key(creator_key, &dek)?,
            helper_wrapped_dek: None,
            encrypted_payload: encrypt_payload(&dek, contacts)?,
            escrowed_dek: Some(self.escrow.seal_dek(&key.storage_key(), &dek)?),
            created_at: now,
            helper_wrapped_at: None,
        };

        self.db.insert_contact_key(&record).map_err(|e| match e {
            DbError::AlreadyExists(_) => ContactError::ContactKeyExists(key),
            DbError::NotFound(_) => ContactError::TaskNotFound(key),
            other => other.into(),
        })?;

        tracing::info!(task = %key, "Contact key created");
        Ok(record)
    }

    /// Create the contact key for the task's creator using their profile key.
    pub fn create_for_creator(
        &self,
        task_id: u64,
        contacts: &str,
        now: DateTime<Utc>,
    ) -> Result<ContactKeyRecord, ContactError> {
        let key = self.key(task_id);
        let task = self
            .db
            .get_task(&key)?
            .ok_or(ContactError::TaskNotFound(key))?;
        let creator_key = self.public_key_for(&task.creator)?;
        self.create_contact_key(task_id, contacts, &creator_key, now)
    }

    /// Wrap the task's DEK for `helper_key`. Succeeds at most once per task.
    pub fn add_helper_wrap(
        &self,
        task_id: u64,
        helper_key: &EncryptionPublicKey,
        now: DateTime<Utc>,
    ) -> Result<ContactKeyRecord, ContactError> {
        let key = self.key(task_id);
        let record = self
            .db
            .get_contact_key(&key)?
            .ok_or(ContactError::ContactKeyNotFound(key))?;

        if record.helper_wrapped_dek.is_some() {
            return Err(ContactError::AlreadyWrapped(key));
        }
        let sealed = record
            .escrowed_dek
            .as_ref()
            .ok_or(ContactError::EscrowUnavailable(key))?;

        let dek = self.escrow.open_dek(&key.storage_key(), sealed).map_err(|e| {
            tracing::error!(task = %key, error = %e, "Escrowed DEK could not be opened");
            ContactError::EscrowUnavailable(key)
        })?;
        let wrapped = wrap_key(helper_key, &dek)?;

        let stored = self
            .db
            .attach_helper_wrap(&key, &wrapped, now)
            .map_err(|e| match e {
                DbError::Conflict(_) => ContactError::AlreadyWrapped(key),
                DbError::NotFound(_) => ContactError::ContactKeyNotFound(key),
                other => other.into(),
            })?;

        tracing::info!(task = %key, "Helper wrap stored");
        Ok(stored)
    }

    /// Wrap for the task's accepted helper using their profile key.
    pub fn wrap_for_helper(
        &self,
        task_id: u64,
        now: DateTime<Utc>,
    ) -> Result<ContactKeyRecord, ContactError> {
        let key = self.key(task_id);
        let task = self
            .db
            .get_task(&key)?
            .ok_or(ContactError::TaskNotFound(key))?;
        let helper = task
            .helper
            .as_ref()
            .ok_or(TaskStateError::HelperRequired(task.status))?;
        let helper_key = self.public_key_for(helper)?;
        self.add_helper_wrap(task_id, &helper_key, now)
    }

    /// Wrap for the accepted helper as soon as both the helper and the
    /// contact key exist.
    ///
    /// Returns `Ok(None)` when there is nothing to do: no helper yet, no
    /// contact key yet, or the helper wrap is already stored (including by a
    /// concurrent caller).
    pub fn wrap_if_ready(
        &self,
        task_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<ContactKeyRecord>, ContactError> {
        let key = self.key(task_id);
        let task = self
            .db
            .get_task(&key)?
            .ok_or(ContactError::TaskNotFound(key))?;
        let Some(helper) = task.helper.as_ref() else {
            return Ok(None);
        };
        match self.db.get_contact_key(&key)? {
            Some(record) if record.helper_wrapped_dek.is_none() => {}
            _ => return Ok(None),
        }

        let helper_key = self.public_key_for(helper)?;
        match self.add_helper_wrap(task_id, &helper_key, now) {
            Ok(record) => Ok(Some(record)),
            Err(ContactError::AlreadyWrapped(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
