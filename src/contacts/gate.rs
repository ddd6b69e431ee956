// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature-based authorization gate.
//!
//! Releases a party's wrapped DEK once the requester proves control of the
//! claimed address. Checks run in a fixed order so that a valid signature
//! over the wrong message still fails as a message mismatch:
//!
//! 1. message matches the challenge
//! 2. signature recovers to the claimed address
//! 3. task exists
//! 4. address is the creator or the helper
//! 5. that party's wrap exists
//!
//! Under the nonced policy the challenge is looked up by the nonce embedded in
//! the signed message and consumed between steps 2 and 3, so a signed
//! challenge is good for exactly one attempt. Issuing another challenge for
//! the same address leaves earlier ones usable.

use chrono::{DateTime, Utc};

use super::{ContactError, ContactRole};
use crate::auth::challenge::{challenge_nonce, new_challenge, static_message};
use crate::auth::{recover_signer, ChallengePolicy};
use crate::crypto::{EncryptedPayload, WrappedKey};
use crate::models::{TaskKey, WalletAddress};
use crate::storage::{ContactDatabase, DbError};

/// A signed request for a task's contacts.
#[derive(Debug, Clone)]
pub struct ContactRequest {
    pub task_id: u64,
    pub address: WalletAddress,
    pub signature: String,
    pub message: String,
}

/// What the gate releases: opaque blobs only the requester can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGrant {
    pub role: ContactRole,
    pub wrapped_dek: WrappedKey,
    pub encrypted_payload: EncryptedPayload,
}

/// A challenge handed to a requester to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub message: String,
    pub nonce: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct AuthorizationGate<'a> {
    db: &'a ContactDatabase,
    policy: ChallengePolicy,
    chain_id: u64,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(db: &'a ContactDatabase, policy: ChallengePolicy, chain_id: u64) -> Self {
        Self {
            db,
            policy,
            chain_id,
        }
    }

    /// Produce the message `address` must sign to read `task_id`'s contacts.
    ///
    /// Fails with `TooManyChallenges` once the address holds the maximum
    /// number of unexpired challenges for the task.
    pub fn issue_challenge(
        &self,
        task_id: u64,
        address: &WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<IssuedChallenge, ContactError> {
        let key = TaskKey::new(self.chain_id, task_id);
        if self.db.get_task(&key)?.is_none() {
            return Err(ContactError::TaskNotFound(key));
        }

        match self.policy {
            ChallengePolicy::Static => Ok(IssuedChallenge {
                message: static_message(task_id),
                nonce: None,
                expires_at: None,
            }),
            ChallengePolicy::Nonced { ttl } => {
                let pending = new_challenge(task_id, now, ttl);
                self.db
                    .put_challenge(&key, address, &pending, now)
                    .map_err(|e| match e {
                        DbError::Capacity(_) => ContactError::TooManyChallenges,
                        other => other.into(),
                    })?;
                Ok(IssuedChallenge {
                    message: pending.message,
                    nonce: Some(pending.nonce),
                    expires_at: Some(pending.expires_at),
                })
            }
        }
    }

    pub fn verify_contact_request(
        &self,
        request: &ContactRequest,
        now: DateTime<Utc>,
    ) -> Result<ContactGrant, ContactError> {
        let key = TaskKey::new(self.chain_id, request.task_id);

        // 1. Message
        let nonce = match self.policy {
            ChallengePolicy::Static => {
                if request.message != static_message(request.task_id) {
                    return Err(ContactError::MessageMismatch);
                }
                None
            }
            ChallengePolicy::Nonced { .. } => {
                let nonce = challenge_nonce(&request.message).ok_or(ContactError::MessageMismatch)?;
                let pending = self
                    .db
                    .get_challenge(&key, &request.address, nonce)?
                    .ok_or(ContactError::MessageMismatch)?;
                if pending.message != request.message {
                    return Err(ContactError::MessageMismatch);
                }
                if pending.expires_at <= now {
                    return Err(ContactError::ChallengeExpired);
                }
                Some(pending.nonce)
            }
        };

        // 2. Signature
        let signer = recover_signer(&request.message, &request.signature)
            .map_err(|_| ContactError::InvalidSignature)?;
        if signer != request.address {
            return Err(ContactError::InvalidSignature);
        }

        if let Some(nonce) = nonce {
            if !self.db.take_challenge(&key, &request.address, &nonce)? {
                return Err(ContactError::MessageMismatch);
            }
        }

        // 3. Task
        let task = self
            .db
            .get_task(&key)?
            .ok_or(ContactError::TaskNotFound(key))?;

        // 4. Role
        let role = ContactRole::resolve(&task, &request.address).ok_or(ContactError::Unauthorized)?;

        // 5. Wrap
        let record = self
            .db
            .get_contact_key(&key)?
            .ok_or(ContactError::KeyNotAvailable)?;
        let wrapped_dek = role
            .wrapped_key(&record)
            .cloned()
            .ok_or(ContactError::KeyNotAvailable)?;

        Ok(ContactGrant {
            role,
            wrapped_dek,
            encrypted_payload: record.encrypted_payload,
        })
    }
}
