// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors raised by the contact encryption primitives.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    EncryptionFailed,

    /// Any unwrap or payload decryption failure. Deliberately carries no
    /// detail: tag mismatch, malformed input and wrong key look identical.
    #[error("decryption failed")]
    DecryptionFailed,
}
