// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contact payload encryption under a task DEK.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::dek::DataKey;
use super::CryptoError;

const PAYLOAD_AAD: &[u8] = b"contact-vault/contact-payload";

/// Base64 text of `nonce || ciphertext || tag` for a contact payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct EncryptedPayload(String);

impl EncryptedPayload {
    pub fn from_encoded(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn encrypt_payload(dek: &DataKey, plaintext: &str) -> Result<EncryptedPayload, CryptoError> {
    let sealed = dek.seal(plaintext.as_bytes(), PAYLOAD_AAD)?;
    Ok(EncryptedPayload(Base64::encode_string(&sealed)))
}

/// Decrypt a payload. Non-UTF-8 plaintext is treated as a decryption failure.
pub fn decrypt_payload(dek: &DataKey, payload: &EncryptedPayload) -> Result<String, CryptoError> {
    let sealed = Base64::decode_vec(&payload.0).map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = dek.open(&sealed, PAYLOAD_AAD)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt() {
        let dek = DataKey::generate();
        let payload = encrypt_payload(&dek, "email: alice@example.com").unwrap();
        assert!(!payload.as_str().contains("alice"));
        assert_eq!(decrypt_payload(&dek, &payload).unwrap(), "email: alice@example.com");
    }

    #[test]
    fn wrong_dek_fails() {
        let payload = encrypt_payload(&DataKey::generate(), "tg:@alice").unwrap();
        assert_eq!(
            decrypt_payload(&DataKey::generate(), &payload),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn invalid_base64_fails() {
        let dek = DataKey::generate();
        assert_eq!(
            decrypt_payload(&dek, &EncryptedPayload::from_encoded("***")),
            Err(CryptoError::DecryptionFailed)
        );
    }
}
