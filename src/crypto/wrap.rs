// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-recipient DEK wrapping (ECIES over secp256k1).
//!
//! ```text
//! wrapped = ephemeral_pubkey (33) || nonce (24) || sealed_dek (32 + 16)
//! kek     = HKDF-SHA256(ikm = ECDH(ephemeral, recipient),
//!                       salt = ephemeral_pubkey || recipient_pubkey,
//!                       info = WRAP_INFO)
//! ```
//!
//! Each wrap uses a fresh ephemeral key, so wrapping the same DEK twice for
//! the same recipient yields different blobs.

use base64ct::{Base64, Encoding};
use chacha20poly1305::aead::OsRng;
use hkdf::Hkdf;
use k256::{ecdh::diffie_hellman, PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;
use zeroize::Zeroizing;

use super::dek::{DataKey, DEK_LEN, NONCE_LEN, TAG_LEN};
use super::keypair::{EncryptionPublicKey, EncryptionSecretKey, PUBLIC_KEY_LEN};
use super::CryptoError;

const WRAP_INFO: &[u8] = b"contact-vault/dek-wrap/v1";
const WRAP_AAD: &[u8] = b"contact-vault/wrapped-dek";

/// Exact byte length of a decoded wrapped key.
pub const WRAPPED_KEY_LEN: usize = PUBLIC_KEY_LEN + NONCE_LEN + DEK_LEN + TAG_LEN;

/// Base64 text of a wrapped DEK. Opaque to everyone but the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct WrappedKey(String);

impl WrappedKey {
    pub fn from_encoded(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn decode(&self) -> Result<Vec<u8>, CryptoError> {
        Base64::decode_vec(&self.0).map_err(|_| CryptoError::DecryptionFailed)
    }
}

fn derive_kek(
    secret: &SecretKey,
    peer: &PublicKey,
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> Result<DataKey, CryptoError> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

    let mut salt = Vec::with_capacity(ephemeral_public.len() + recipient_public.len());
    salt.extend_from_slice(ephemeral_public);
    salt.extend_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared.raw_secret_bytes().as_slice());
    let mut okm = Zeroizing::new([0u8; DEK_LEN]);
    hkdf.expand(WRAP_INFO, &mut okm[..])
        .map_err(|_| CryptoError::InvalidKey("hkdf output length".to_string()))?;
    DataKey::from_bytes(&okm[..])
}

/// Wrap `dek` so only the holder of `recipient`'s secret key can recover it.
pub fn wrap_key(recipient: &EncryptionPublicKey, dek: &DataKey) -> Result<WrappedKey, CryptoError> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_bytes = EncryptionPublicKey::from_inner(ephemeral.public_key()).to_sec1_bytes();
    let recipient_bytes = recipient.to_sec1_bytes();

    let kek = derive_kek(&ephemeral, recipient.inner(), &ephemeral_bytes, &recipient_bytes)?;
    let sealed = kek.seal(dek.as_bytes(), WRAP_AAD)?;

    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(&ephemeral_bytes);
    out.extend_from_slice(&sealed);
    Ok(WrappedKey(Base64::encode_string(&out)))
}

/// Recover the DEK from a wrapped blob. Every failure is `DecryptionFailed`.
pub fn unwrap_key(secret: &EncryptionSecretKey, wrapped: &WrappedKey) -> Result<DataKey, CryptoError> {
    let bytes = wrapped.decode()?;
    if bytes.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let (ephemeral_bytes, sealed) = bytes.split_at(PUBLIC_KEY_LEN);
    let ephemeral =
        PublicKey::from_sec1_bytes(ephemeral_bytes).map_err(|_| CryptoError::DecryptionFailed)?;
    let recipient_bytes = secret.public_key().to_sec1_bytes();

    let kek = derive_kek(secret.inner(), &ephemeral, ephemeral_bytes, &recipient_bytes)?;
    let dek = Zeroizing::new(kek.open(sealed, WRAP_AAD)?);
    DataKey::from_bytes(&dek).map_err(|_| CryptoError::DecryptionFailed)
}
