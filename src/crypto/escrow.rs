// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side DEK escrow.
//!
//! The escrow holds a task's DEK sealed under a server key between contact
//! key creation and the helper wrap. It is the only server-held route back
//! to a DEK and is cleared once the helper wrap is stored or the task is
//! cancelled.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::dek::{DataKey, DEK_LEN};
use super::CryptoError;

/// DEK sealed under the escrow key, base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedDek(String);

/// Symmetric key protecting escrowed DEKs.
#[derive(Debug, Clone)]
pub struct EscrowKey(DataKey);

impl EscrowKey {
    /// Parse a 32-byte key from hex.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            alloy::hex::decode(value.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        if bytes.len() != DEK_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "escrow key must be {DEK_LEN} bytes"
            )));
        }
        DataKey::from_bytes(&bytes).map(Self)
    }

    /// Random key that lives only as long as the process.
    pub fn ephemeral() -> Self {
        Self(DataKey::generate())
    }

    /// Seal `dek`, binding it to `scope` (the chain-scoped task key).
    pub fn seal_dek(&self, scope: &str, dek: &DataKey) -> Result<SealedDek, CryptoError> {
        let sealed = self.0.seal(dek.as_bytes(), scope.as_bytes())?;
        Ok(SealedDek(Base64::encode_string(&sealed)))
    }

    pub fn open_dek(&self, scope: &str, sealed: &SealedDek) -> Result<DataKey, CryptoError> {
        let bytes = Base64::decode_vec(&sealed.0).map_err(|_| CryptoError::DecryptionFailed)?;
        let dek = Zeroizing::new(self.0.open(&bytes, scope.as_bytes())?);
        DataKey::from_bytes(&dek).map_err(|_| CryptoError::DecryptionFailed)
    }
}
