// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Contact Encryption Primitives
//!
//! - `dek` - random data encryption keys and XChaCha20-Poly1305 sealing
//! - `payload` - contact payload encryption under a DEK
//! - `wrap` - per-recipient DEK wrapping (ECIES over secp256k1)
//! - `keypair` - recipient encryption key pairs
//! - `escrow` - server-side sealing of a DEK until the helper wrap exists
//!
//! All blobs leave this module as base64 text.

pub mod dek;
pub mod error;
pub mod escrow;
pub mod keypair;
pub mod payload;
pub mod wrap;

pub use dek::DataKey;
pub use error::CryptoError;
pub use escrow::{EscrowKey, SealedDek};
pub use keypair::{EncryptionKeyPair, EncryptionPublicKey, EncryptionSecretKey};
pub use payload::{decrypt_payload, encrypt_payload, EncryptedPayload};
pub use wrap::{unwrap_key, wrap_key, WrappedKey};
