// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile endpoints: register and read encryption public keys.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::extract::{ApiJson, ApiPath};
use crate::{
    error::{ApiError, ErrorBody},
    models::{Profile, WalletAddress},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Register an encryption public key for a wallet.
///
/// `signature` is `personal_sign` over
/// `Register encryption key {encryptionPublicKey} for {address} at {issuedAt}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfileRequest {
    pub address: String,
    /// 0x-hex SEC1 secp256k1 public key.
    pub encryption_public_key: String,
    /// RFC 3339 signing time. Must be close to the server clock and later
    /// than any earlier registration for the address.
    pub issued_at: String,
    pub signature: String,
}

#[utoipa::path(
    post,
    path = "/v1/profiles",
    tag = "Profiles",
    request_body = RegisterProfileRequest,
    responses(
        (status = 200, description = "Key registered", body = Profile),
        (status = 400, description = "Malformed address or key", body = ErrorBody),
        (status = 401, description = "Signature does not match the address", body = ErrorBody),
        (status = 409, description = "Older than the stored registration or outside the clock window", body = ErrorBody)
    )
)]
pub async fn register_profile(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.profiles().register_encryption_key(
        &request.address,
        &request.encryption_public_key,
        &request.issued_at,
        &request.signature,
        Utc::now(),
    )?;

    state.audit.record(
        AuditEvent::new(AuditEventType::ProfileKeyRegistered).with_address(&profile.address),
    );

    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/v1/profiles/{address}",
    tag = "Profiles",
    params(
        ("address" = String, Path, description = "Wallet address")
    ),
    responses(
        (status = 200, description = "Registered profile", body = Profile),
        (status = 404, description = "No key registered", body = ErrorBody)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> Result<Json<Profile>, ApiError> {
    let address = WalletAddress::parse(&address).map_err(|e| ApiError::bad_request(e.to_string()))?;
    state
        .profiles()
        .get_profile(&address)?
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "profile_not_found",
                format!("No encryption key registered for {address}"),
            )
        })
}
