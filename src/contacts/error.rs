// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failure taxonomy for contact disclosure.

use axum::http::StatusCode;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::models::{TaskKey, TaskStateError, WalletAddress};
use crate::storage::DbError;

#[derive(Debug, Error)]
pub enum ContactError {
    // Input / validation
    #[error("no encryption public key registered for {0}")]
    MissingPublicKey(WalletAddress),

    #[error("message does not match the expected challenge")]
    MessageMismatch,

    #[error("challenge has expired")]
    ChallengeExpired,

    #[error("too many pending challenges, sign or wait for one to expire")]
    TooManyChallenges,

    #[error("registration is older than the stored key or outside the clock window")]
    StaleRegistration,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Authorization
    #[error("signature does not match the claimed address")]
    InvalidSignature,

    #[error("not authorized for this task's contacts")]
    Unauthorized,

    // State
    #[error("task {0} not found")]
    TaskNotFound(TaskKey),

    #[error("task {0} already exists")]
    TaskExists(TaskKey),

    #[error(transparent)]
    InvalidTaskState(#[from] TaskStateError),

    #[error("no contact key for task {0}")]
    ContactKeyNotFound(TaskKey),

    #[error("contact key for task {0} already exists")]
    ContactKeyExists(TaskKey),

    #[error("helper wrap for task {0} already stored")]
    AlreadyWrapped(TaskKey),

    #[error("escrowed key for task {0} is not available")]
    EscrowUnavailable(TaskKey),

    #[error("wrapped key not available yet")]
    KeyNotAvailable,

    // Cryptographic
    #[error("decryption failed")]
    Decryption,

    // Internal
    #[error(transparent)]
    Crypto(CryptoError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<CryptoError> for ContactError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => ContactError::Decryption,
            other => ContactError::Crypto(other),
        }
    }
}

impl ContactError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ContactError::MissingPublicKey(_) => "missing_public_key",
            ContactError::MessageMismatch => "message_mismatch",
            ContactError::ChallengeExpired => "challenge_expired",
            ContactError::TooManyChallenges => "too_many_challenges",
            ContactError::StaleRegistration => "stale_registration",
            ContactError::InvalidInput(_) => "invalid_input",
            ContactError::InvalidSignature => "invalid_signature",
            ContactError::Unauthorized => "unauthorized",
            ContactError::TaskNotFound(_) => "task_not_found",
            ContactError::TaskExists(_) => "task_exists",
            ContactError::InvalidTaskState(_) => "invalid_task_state",
            ContactError::ContactKeyNotFound(_) => "contact_key_not_found",
            ContactError::ContactKeyExists(_) => "contact_key_exists",
            ContactError::AlreadyWrapped(_) => "already_wrapped",
            ContactError::EscrowUnavailable(_) => "escrow_unavailable",
            ContactError::KeyNotAvailable => "key_not_available",
            ContactError::Decryption => "decryption_failed",
            ContactError::Crypto(_) | ContactError::Storage(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactError::MessageMismatch
            | ContactError::ChallengeExpired
            | ContactError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ContactError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ContactError::TooManyChallenges => StatusCode::TOO_MANY_REQUESTS,
            ContactError::Unauthorized => StatusCode::FORBIDDEN,
            ContactError::TaskNotFound(_) | ContactError::ContactKeyNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ContactError::TaskExists(_)
            | ContactError::StaleRegistration
            | ContactError::InvalidTaskState(_)
            | ContactError::ContactKeyExists(_)
            | ContactError::AlreadyWrapped(_)
            | ContactError::EscrowUnavailable(_)
            | ContactError::KeyNotAvailable => StatusCode::CONFLICT,
            ContactError::MissingPublicKey(_) | ContactError::Decryption => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ContactError::Crypto(_) | ContactError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failures_keep_their_own_code() {
        let err = ContactError::from(CryptoError::DecryptionFailed);
        assert_eq!(err.code(), "decryption_failed");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ContactError::from(CryptoError::EncryptionFailed);
        assert_eq!(err.code(), "internal_error");
        assert!(err.is_internal());
    }

    #[test]
    fn race_and_wait_states_are_distinguishable() {
        let key = TaskKey::new(43113, 8);
        let lost = ContactError::AlreadyWrapped(key);
        let wait = ContactError::KeyNotAvailable;
        let missing = ContactError::TaskNotFound(key);

        assert_ne!(lost.code(), wait.code());
        assert_ne!(wait.code(), missing.code());
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn challenge_cap_is_a_rate_limit() {
        let err = ContactError::TooManyChallenges;
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(!err.is_internal());
    }

    #[test]
    fn unauthorized_message_names_no_address() {
        let message = ContactError::Unauthorized.to_string();
        assert!(!message.contains("0x"));
    }
}
