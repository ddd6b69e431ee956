// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 encryption key pairs.
//!
//! The public half is registered on a user's profile and is the target of
//! DEK wrapping. The secret half is generated and kept by the client; the
//! server only ever parses public keys.

use chacha20poly1305::aead::OsRng;
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};

use super::CryptoError;

/// Length of a compressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Recipient public key for DEK wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionPublicKey(PublicKey);

impl EncryptionPublicKey {
    /// Parse a 0x-hex SEC1 public key (compressed or uncompressed).
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = alloy::hex::decode(value.trim())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_sec1_bytes(&bytes)
    }

    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey("not a secp256k1 point".to_string()))
    }

    /// Compressed SEC1 encoding.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Canonical 0x-hex form (compressed).
    pub fn to_hex(&self) -> String {
        alloy::hex::encode_prefixed(self.to_sec1_bytes())
    }

    pub(crate) fn from_inner(key: PublicKey) -> Self {
        Self(key)
    }

    pub(crate) fn inner(&self) -> &PublicKey {
        &self.0
    }
}

/// Recipient secret key. Client-side only.
#[derive(Clone)]
pub struct EncryptionSecretKey(SecretKey);

impl EncryptionSecretKey {
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = alloy::hex::decode(value.trim())
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        SecretKey::from_slice(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPrivateKey("not a secp256k1 scalar".to_string()))
    }

    /// 0x-hex encoding for client-local persistence.
    pub fn to_hex(&self) -> String {
        alloy::hex::encode_prefixed(self.0.to_bytes())
    }

    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(self.0.public_key())
    }

    pub(crate) fn inner(&self) -> &SecretKey {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionSecretKey(<redacted>)")
    }
}

/// A freshly generated key pair.
#[derive(Debug, Clone)]
pub struct EncryptionKeyPair {
    pub public: EncryptionPublicKey,
    pub secret: EncryptionSecretKey,
}

impl EncryptionKeyPair {
    pub fn generate() -> Self {
        let secret = EncryptionSecretKey(SecretKey::random(&mut OsRng));
        Self {
            public: secret.public_key(),
            secret,
        }
    }
}
