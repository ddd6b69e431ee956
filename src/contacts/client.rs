// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Requester-side unwrap and decrypt.
//!
//! Runs wherever the recipient's secret key lives. The server never calls
//! this; it is exported for clients and used by tests to close the loop.

use crate::crypto::{
    decrypt_payload, unwrap_key, CryptoError, EncryptedPayload, EncryptionSecretKey, WrappedKey,
};

/// Recover the plaintext contacts from a released grant.
///
/// Any tag mismatch or malformed input yields [`CryptoError::DecryptionFailed`];
/// there is no partial output.
pub fn decrypt_contacts(
    wrapped_dek: &WrappedKey,
    secret_key: &EncryptionSecretKey,
    encrypted_payload: &EncryptedPayload,
) -> Result<String, CryptoError> {
    let dek = unwrap_key(secret_key, wrapped_dek)?;
    decrypt_payload(&dek, encrypted_payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt_payload, wrap_key, DataKey, EncryptionKeyPair};
    use base64ct::{Base64, Encoding};

    fn sealed_for(pair: &EncryptionKeyPair, contacts: &str) -> (WrappedKey, EncryptedPayload) {
        let dek = DataKey::generate();
        (
            wrap_key(&pair.public, &dek).unwrap(),
            encrypt_payload(&dek, contacts).unwrap(),
        )
    }

    #[test]
    fn decrypts_with_matching_secret() {
        let pair = EncryptionKeyPair::generate();
        let (wrapped, payload) = sealed_for(&pair, "tg:@alice");
        assert_eq!(
            decrypt_contacts(&wrapped, &pair.secret, &payload).unwrap(),
            "tg:@alice"
        );
    }

    #[test]
    fn tampered_wrap_fails_closed() {
        let pair = EncryptionKeyPair::generate();
        let (wrapped, payload) = sealed_for(&pair, "tg:@alice");
        let mut bytes = Base64::decode_vec(wrapped.as_str()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = WrappedKey::from_encoded(Base64::encode_string(&bytes));

        assert_eq!(
            decrypt_contacts(&tampered, &pair.secret, &payload),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn tampered_payload_fails_closed() {
        let pair = EncryptionKeyPair::generate();
        let (wrapped, payload) = sealed_for(&pair, "tg:@alice");
        let mut bytes = Base64::decode_vec(payload.as_str()).unwrap();
        bytes[30] ^= 0x01;
        let tampered = EncryptedPayload::from_encoded(Base64::encode_string(&bytes));

        assert_eq!(
            decrypt_contacts(&wrapped, &pair.secret, &tampered),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn payload_from_another_task_is_rejected() {
        let pair = EncryptionKeyPair::generate();
        let (wrapped, _) = sealed_for(&pair, "tg:@alice");
        let (_, other_payload) = sealed_for(&pair, "tg:@bob");
        assert_eq!(
            decrypt_contacts(&wrapped, &pair.secret, &other_payload),
            Err(CryptoError::DecryptionFailed)
        );
    }
}
