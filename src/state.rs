// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::ChallengePolicy;
use crate::config::Config;
use crate::contacts::{AuthorizationGate, KeyWrappingService, ProfileRegistry, TaskMirror};
use crate::crypto::EscrowKey;
use crate::storage::{AuditLog, ContactDatabase, DbError, StoragePaths};

/// Request-independent settings handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub chain_id: u64,
    pub challenge_policy: ChallengePolicy,
    pub internal_api_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ContactDatabase>,
    pub audit: Arc<AuditLog>,
    pub escrow: Arc<EscrowKey>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Open storage under `config.data_dir` and assemble the shared state.
    pub fn open(config: &Config) -> Result<Self, DbError> {
        let paths = StoragePaths::new(&config.data_dir);
        let db = ContactDatabase::open(&paths.database())?;

        let escrow = match &config.escrow_key {
            Some(key) => key.clone(),
            None => {
                tracing::warn!(
                    "CONTACT_ESCROW_KEY not set; using an ephemeral escrow key. \
                     Contact keys created before a restart cannot be wrapped for helpers."
                );
                EscrowKey::ephemeral()
            }
        };

        Ok(Self {
            db: Arc::new(db),
            audit: Arc::new(AuditLog::new(paths)),
            escrow: Arc::new(escrow),
            settings: Arc::new(Settings {
                chain_id: config.chain_id,
                challenge_policy: config.challenge_policy,
                internal_api_token: config.internal_api_token.clone(),
            }),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.settings.chain_id
    }

    pub fn wrapping(&self) -> KeyWrappingService<'_> {
        KeyWrappingService::new(&self.db, &self.escrow, self.settings.chain_id)
    }

    pub fn gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(&self.db, self.settings.challenge_policy, self.settings.chain_id)
    }

    pub fn tasks(&self) -> TaskMirror<'_> {
        TaskMirror::new(&self.db, self.settings.chain_id)
    }

    pub fn profiles(&self) -> ProfileRegistry<'_> {
        ProfileRegistry::new(&self.db)
    }
}
