// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor guarding internal endpoints.
//!
//! Task publication, acceptance, status updates and key wrapping are driven
//! by the chain indexer, not by end users. Those handlers take
//! [`InternalAuth`] as an argument:
//!
//! ```rust,ignore
//! async fn publish_task(_: InternalAuth, State(state): State<AppState>) -> impl IntoResponse {
//!     // caller presented the configured bearer token
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use sha2::{Digest, Sha256};

use super::AuthError;
use crate::state::AppState;

/// Proof that the caller presented `Authorization: Bearer {INTERNAL_API_TOKEN}`.
///
/// When no token is configured every request is rejected.
pub struct InternalAuth;

impl FromRequestParts<AppState> for InternalAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .settings
            .internal_api_token
            .as_deref()
            .ok_or(AuthError::NotConfigured)?;

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        if tokens_match(token, expected) {
            Ok(InternalAuth)
        } else {
            tracing::warn!("Rejected internal request with invalid token");
            Err(AuthError::InvalidToken)
        }
    }
}

/// Compare digests so the comparison time does not depend on the shared prefix.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
