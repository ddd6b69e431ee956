// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for contact-flow tests.

use alloy::signers::{local::PrivateKeySigner, SignerSync};
use chrono::Utc;
use tempfile::TempDir;

use super::{AuthorizationGate, KeyWrappingService, NewTask, TaskMirror};
use crate::auth::ChallengePolicy;
use crate::crypto::{EncryptionKeyPair, EscrowKey};
use crate::models::{ContactKeyRecord, Profile, Task, TaskKey, WalletAddress};
use crate::storage::ContactDatabase;

pub const CHAIN_ID: u64 = 43113;

/// `personal_sign` over `message`, 0x-hex.
pub fn sign(signer: &PrivateKeySigner, message: &str) -> String {
    let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
    alloy::hex::encode_prefixed(signature.as_bytes())
}

/// Scratch database with three wallets: creator Alice, helper Bob, outsider Eve.
pub struct Fixture {
    pub db: ContactDatabase,
    pub escrow: EscrowKey,
    pub alice_signer: PrivateKeySigner,
    pub bob_signer: PrivateKeySigner,
    pub eve_signer: PrivateKeySigner,
    pub alice: WalletAddress,
    pub bob: WalletAddress,
    pub eve: WalletAddress,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = ContactDatabase::open(&dir.path().join("contacts.redb")).unwrap();
        let alice_signer = PrivateKeySigner::random();
        let bob_signer = PrivateKeySigner::random();
        let eve_signer = PrivateKeySigner::random();
        Self {
            db,
            escrow: EscrowKey::ephemeral(),
            alice: alice_signer.address().into(),
            bob: bob_signer.address().into(),
            eve: eve_signer.address().into(),
            alice_signer,
            bob_signer,
            eve_signer,
            _dir: dir,
        }
    }

    pub fn wrapping(&self) -> KeyWrappingService<'_> {
        KeyWrappingService::new(&self.db, &self.escrow, CHAIN_ID)
    }

    pub fn gate(&self, policy: ChallengePolicy) -> AuthorizationGate<'_> {
        AuthorizationGate::new(&self.db, policy, CHAIN_ID)
    }

    pub fn mirror(&self) -> TaskMirror<'_> {
        TaskMirror::new(&self.db, CHAIN_ID)
    }

    /// Publish `task_id` with Alice as creator.
    pub fn publish(&self, task_id: u64) -> Task {
        self.mirror()
            .publish_task(
                NewTask {
                    task_id,
                    title: "Logo design".into(),
                    description: "Vector logo for a bakery".into(),
                    creator: self.alice.clone(),
                    reward: "1000000000000000000".into(),
                    category: None,
                },
                Utc::now(),
            )
            .unwrap()
    }

    pub fn accept(&self, task_id: u64, helper: &WalletAddress) -> Task {
        self.mirror()
            .accept_task(task_id, helper.clone(), Utc::now())
            .unwrap()
    }

    /// Store a fresh encryption key pair on `address`'s profile.
    pub fn register(&self, address: &WalletAddress) -> EncryptionKeyPair {
        let pair = EncryptionKeyPair::generate();
        self.db
            .put_profile(&Profile {
                address: address.clone(),
                encryption_public_key: pair.public.to_hex(),
                updated_at: Utc::now(),
            })
            .unwrap();
        pair
    }

    pub fn contact_key(&self, task_id: u64) -> ContactKeyRecord {
        self.db
            .get_contact_key(&TaskKey::new(CHAIN_ID, task_id))
            .unwrap()
            .unwrap()
    }
}
