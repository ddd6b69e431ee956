// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contact disclosure endpoints.
//!
//! A requester first obtains a challenge, signs it with their wallet and
//! posts the signature to `/v1/contacts/decrypt`. The response holds only
//! ciphertext: the requester's own wrapped DEK and the encrypted payload.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::extract::ApiJson;
use crate::{
    contacts::{ContactGrant, ContactRequest, ContactRole},
    crypto::{EncryptedPayload, WrappedKey},
    error::{ApiError, ErrorBody},
    models::{TaskKey, WalletAddress},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub task_id: u64,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// Exact text to sign with `personal_sign`.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    pub task_id: u64,
    pub address: String,
    pub signature: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub role: ContactRole,
    #[serde(rename = "wrappedDEK")]
    pub wrapped_dek: WrappedKey,
    pub encrypted_payload: EncryptedPayload,
}

impl From<ContactGrant> for DecryptResponse {
    fn from(grant: ContactGrant) -> Self {
        Self {
            role: grant.role,
            wrapped_dek: grant.wrapped_dek,
            encrypted_payload: grant.encrypted_payload,
        }
    }
}

fn parse_address(value: &str) -> Result<WalletAddress, ApiError> {
    WalletAddress::parse(value).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/v1/contacts/challenge",
    tag = "Contacts",
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Message to sign", body = ChallengeResponse),
        (status = 400, description = "Malformed address", body = ErrorBody),
        (status = 404, description = "Task not found", body = ErrorBody),
        (status = 429, description = "Too many pending challenges for this address", body = ErrorBody)
    )
)]
pub async fn issue_challenge(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let address = parse_address(&request.address)?;
    let issued = state
        .gate()
        .issue_challenge(request.task_id, &address, Utc::now())?;

    if issued.nonce.is_some() {
        state.audit.record(
            AuditEvent::new(AuditEventType::ChallengeIssued)
                .with_address(&address)
                .with_task(TaskKey::new(state.chain_id(), request.task_id)),
        );
    }

    Ok(Json(ChallengeResponse {
        message: issued.message,
        nonce: issued.nonce,
        expires_at: issued.expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/contacts/decrypt",
    tag = "Contacts",
    request_body = DecryptRequest,
    responses(
        (status = 200, description = "Wrapped key material for the requester", body = DecryptResponse),
        (status = 400, description = "Message mismatch or expired challenge", body = ErrorBody),
        (status = 401, description = "Signature does not match the address", body = ErrorBody),
        (status = 403, description = "Requester is neither creator nor helper", body = ErrorBody),
        (status = 404, description = "Task not found", body = ErrorBody),
        (status = 409, description = "Wrapped key not available yet", body = ErrorBody)
    )
)]
pub async fn decrypt_contacts(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let address = parse_address(&request.address)?;
    let key = TaskKey::new(state.chain_id(), request.task_id);
    let contact_request = ContactRequest {
        task_id: request.task_id,
        address: address.clone(),
        signature: request.signature,
        message: request.message,
    };

    match state.gate().verify_contact_request(&contact_request, Utc::now()) {
        Ok(grant) => {
            state.audit.record(
                AuditEvent::new(AuditEventType::ContactsReleased)
                    .with_address(&address)
                    .with_task(key)
                    .with_details(serde_json::json!({ "role": grant.role })),
            );
            Ok(Json(grant.into()))
        }
        Err(e) => {
            tracing::info!(task = %key, address = %address, code = e.code(), "Contact request denied");
            state.audit.record(
                AuditEvent::new(AuditEventType::ContactsDenied)
                    .with_address(&address)
                    .with_task(key)
                    .failed(e.code()),
            );
            Err(e.into())
        }
    }
}
