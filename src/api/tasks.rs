// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Task mirror and key wrapping endpoints.
//!
//! Everything that writes here is driven by the chain indexer and requires
//! the internal bearer token. Reading a task is public: tasks are public on
//! chain anyway.

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
    auth::InternalAuth,
    contacts::{ContactError, NewTask},
    crypto::{EncryptedPayload, WrappedKey},
    error::{ApiError, ErrorBody},
    models::{ContactKeyRecord, Task, TaskKey, TaskStatus, WalletAddress},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishTaskRequest {
    pub task_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub creator: String,
    /// Reward in the token's smallest unit, decimal string.
    pub reward: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptTaskRequest {
    pub helper: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactsRequest {
    /// Plaintext contact details. Encrypted before anything is stored.
    pub contacts: String,
}

/// Stored wrap material for a task. Opaque to the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactKeyResponse {
    pub task_id: u64,
    #[serde(rename = "creatorWrappedDEK")]
    pub creator_wrapped_dek: WrappedKey,
    #[serde(rename = "helperWrappedDEK", skip_serializing_if = "Option::is_none")]
    pub helper_wrapped_dek: Option<WrappedKey>,
    pub encrypted_payload: EncryptedPayload,
}

impl From<ContactKeyRecord> for ContactKeyResponse {
    fn from(record: ContactKeyRecord) -> Self {
        Self {
            task_id: record.task_id,
            creator_wrapped_dek: record.creator_wrapped_dek,
            helper_wrapped_dek: record.helper_wrapped_dek,
            encrypted_payload: record.encrypted_payload,
        }
    }
}

/// A task plus whether its contact material is in place.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub has_contact_key: bool,
    pub has_helper_wrap: bool,
}

/// Result of recording an acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptTaskResponse {
    #[serde(flatten)]
    pub task: Task,
    /// The helper's wrap was stored as part of this acceptance.
    pub helper_wrapped: bool,
    /// Error code if the helper wrap was attempted and failed. The
    /// acceptance itself still stands; retry with `/helper-wrap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_wrap_error: Option<String>,
}

fn parse_address(value: &str) -> Result<WalletAddress, ApiError> {
    WalletAddress::parse(value).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/v1/tasks",
    tag = "Tasks",
    security(("internal_token" = [])),
    request_body = PublishTaskRequest,
    responses(
        (status = 201, description = "Task mirrored", body = Task),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Task already exists", body = ErrorBody)
    )
)]
pub async fn publish_task(
    _auth: InternalAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PublishTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let creator = parse_address(&request.creator)?;
    let task = state.tasks().publish_task(
        NewTask {
            task_id: request.task_id,
            title: request.title,
            description: request.description,
            creator,
            reward: request.reward,
            category: request.category,
        },
        Utc::now(),
    )?;

    state.audit.record(
        AuditEvent::new(AuditEventType::TaskPublished)
            .with_address(&task.creator)
            .with_task(task.key()),
    );

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/v1/tasks/{task_id}",
    tag = "Tasks",
    params(
        ("task_id" = u64, Path, description = "Task ID on the configured chain")
    ),
    responses(
        (status = 200, description = "Task", body = TaskView),
        (status = 404, description = "Task not found", body = ErrorBody)
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<u64>,
) -> Result<Json<TaskView>, ApiError> {
    let task = state.tasks().get_task(task_id)?;
    let record = state
        .db
        .get_contact_key(&TaskKey::new(state.chain_id(), task_id))
        .map_err(ContactError::from)?;

    Ok(Json(TaskView {
        has_contact_key: record.is_some(),
        has_helper_wrap: record
            .as_ref()
            .is_some_and(|r| r.helper_wrapped_dek.is_some()),
        task,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/tasks/{task_id}/accept",
    tag = "Tasks",
    security(("internal_token" = [])),
    params(
        ("task_id" = u64, Path, description = "Task ID on the configured chain")
    ),
    request_body = AcceptTaskRequest,
    responses(
        (status = 200, description = "Helper recorded, wrapped if contacts exist", body = AcceptTaskResponse),
        (status = 404, description = "Task not found", body = ErrorBody),
        (status = 409, description = "Task is not open", body = ErrorBody)
    )
)]
pub async fn accept_task(
    _auth: InternalAuth,
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<u64>,
    ApiJson(request): ApiJson<AcceptTaskRequest>,
) -> Result<Json<AcceptTaskResponse>, ApiError> {
    let helper = parse_address(&request.helper)?;
    let task = state.tasks().accept_task(task_id, helper.clone(), Utc::now())?;

    state.audit.record(
        AuditEvent::new(AuditEventType::TaskAccepted)
            .with_address(&helper)
            .with_task(task.key()),
    );

    let (helper_wrapped, helper_wrap_error) = match wrap_pending_helper(&state, task_id) {
        Ok(wrapped) => (wrapped.is_some(), None),
        Err(e) => (false, Some(e.code().to_string())),
    };

    Ok(Json(AcceptTaskResponse {
        task,
        helper_wrapped,
        helper_wrap_error,
    }))
}

/// Wrap for the accepted helper once both the helper and the contact key
/// exist. Failures are logged and audited but never undo the caller's write.
fn wrap_pending_helper(
    state: &AppState,
    task_id: u64,
) -> Result<Option<ContactKeyRecord>, ContactError> {
    let key = TaskKey::new(state.chain_id(), task_id);
    let result = state.wrapping().wrap_if_ready(task_id, Utc::now());
    match &result {
        Ok(Some(_)) => {
            state
                .audit
                .record(AuditEvent::new(AuditEventType::HelperWrapped).with_task(key));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(task = %key, code = e.code(), "Helper wrap deferred");
            state.audit.record(
                AuditEvent::new(AuditEventType::HelperWrapped)
                    .with_task(key)
                    .failed(e.code()),
            );
        }
    }
    result
}

#[utoipa::path(
    put,
    path = "/v1/tasks/{task_id}/status",
    tag = "Tasks",
    security(("internal_token" = [])),
    params(
        ("task_id" = u64, Path, description = "Task ID on the configured chain")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = Task),
        (status = 404, description = "Task not found", body = ErrorBody),
        (status = 409, description = "Transition not allowed", body = ErrorBody)
    )
)]
pub async fn update_status(
    _auth: InternalAuth,
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<u64>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .tasks()
        .update_status(task_id, request.status, Utc::now())?;

    state.audit.record(
        AuditEvent::new(AuditEventType::TaskStatusChanged)
            .with_task(task.key())
            .with_details(serde_json::json!({ "status": task.status.to_string() })),
    );

    Ok(Json(task))
}

#[utoipa::path(
    post,
    path = "/v1/tasks/{task_id}/contacts",
    tag = "Contacts",
    security(("internal_token" = [])),
    params(
        ("task_id" = u64, Path, description = "Task ID on the configured chain")
    ),
    request_body = CreateContactsRequest,
    responses(
        (status = 201, description = "Contacts encrypted and wrapped for the creator, and for the helper if already accepted", body = ContactKeyResponse),
        (status = 404, description = "Task not found", body = ErrorBody),
        (status = 409, description = "Contact key already exists", body = ErrorBody),
        (status = 422, description = "Creator has no encryption key", body = ErrorBody)
    )
)]
pub async fn create_contacts(
    _auth: InternalAuth,
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<u64>,
    ApiJson(request): ApiJson<CreateContactsRequest>,
) -> Result<(StatusCode, Json<ContactKeyResponse>), ApiError> {
    let record = state
        .wrapping()
        .create_for_creator(task_id, &request.contacts, Utc::now())?;

    state
        .audit
        .record(AuditEvent::new(AuditEventType::ContactKeyCreated).with_task(record.key()));

    // A helper accepted before the contacts arrived.
    let record = match wrap_pending_helper(&state, task_id) {
        Ok(Some(wrapped)) => wrapped,
        _ => record,
    };

    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    post,
    path = "/v1/tasks/{task_id}/helper-wrap",
    tag = "Contacts",
    security(("internal_token" = [])),
    params(
        ("task_id" = u64, Path, description = "Task ID on the configured chain")
    ),
    responses(
        (status = 200, description = "DEK wrapped for the accepted helper", body = ContactKeyResponse),
        (status = 404, description = "Task or contact key not found", body = ErrorBody),
        (status = 409, description = "Already wrapped, escrow gone, or no helper yet", body = ErrorBody),
        (status = 422, description = "Helper has no encryption key", body = ErrorBody)
    )
)]
pub async fn helper_wrap(
    _auth: InternalAuth,
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<u64>,
) -> Result<Json<ContactKeyResponse>, ApiError> {
    let key = TaskKey::new(state.chain_id(), task_id);
    match state.wrapping().wrap_for_helper(task_id, Utc::now()) {
        Ok(record) => {
            state
                .audit
                .record(AuditEvent::new(AuditEventType::HelperWrapped).with_task(key));
            Ok(Json(record.into()))
        }
        Err(e) => {
            state.audit.record(
                AuditEvent::new(AuditEventType::HelperWrapped)
                    .with_task(key)
                    .failed(e.code()),
            );
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{register_key, test_state};
    use crate::auth::ChallengePolicy;
    use crate::contacts::decrypt_contacts;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn publish_request(task_id: u64) -> PublishTaskRequest {
        PublishTaskRequest {
            task_id,
            title: "Move a sofa".into(),
            description: "Third floor, no lift".into(),
            creator: ALICE.into(),
            reward: "2000000".into(),
            category: None,
        }
    }

    #[tokio::test]
    async fn accept_wraps_for_helper_without_extra_call() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        let alice_keys = register_key(&state, ALICE);
        let bob_keys = register_key(&state, BOB);

        let (status, Json(task)) =
            publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(5)))
                .await
                .expect("publish succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task.status, TaskStatus::Open);

        let (status, Json(created)) = create_contacts(
            InternalAuth,
            State(state.clone()),
            ApiPath(5),
            ApiJson(CreateContactsRequest {
                contacts: "signal:+15550100".into(),
            }),
        )
        .await
        .expect("contacts created");
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.helper_wrapped_dek.is_none());
        assert_eq!(
            decrypt_contacts(
                &created.creator_wrapped_dek,
                &alice_keys.secret,
                &created.encrypted_payload
            )
            .unwrap(),
            "signal:+15550100"
        );

        let Json(accepted) = accept_task(
            InternalAuth,
            State(state.clone()),
            ApiPath(5),
            ApiJson(AcceptTaskRequest { helper: BOB.into() }),
        )
        .await
        .expect("accept succeeds");
        assert_eq!(accepted.task.status, TaskStatus::InProgress);
        assert!(accepted.helper_wrapped);
        assert!(accepted.helper_wrap_error.is_none());

        let record = state
            .db
            .get_contact_key(&TaskKey::new(state.chain_id(), 5))
            .unwrap()
            .unwrap();
        assert!(record.escrowed_dek.is_none());
        let helper_dek = record.helper_wrapped_dek.expect("helper wrap present");
        assert_eq!(
            decrypt_contacts(&helper_dek, &bob_keys.secret, &record.encrypted_payload).unwrap(),
            "signal:+15550100"
        );

        let err = helper_wrap(InternalAuth, State(state.clone()), ApiPath(5))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "already_wrapped");

        let Json(view) = get_task(State(state), ApiPath(5)).await.unwrap();
        assert!(view.has_contact_key);
        assert!(view.has_helper_wrap);
    }

    #[tokio::test]
    async fn creator_without_key_is_422() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(6)))
            .await
            .unwrap();

        let err = create_contacts(
            InternalAuth,
            State(state),
            ApiPath(6),
            ApiJson(CreateContactsRequest {
                contacts: "tg:@alice".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "missing_public_key");
    }

    #[tokio::test]
    async fn bad_creator_address_is_400() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        let mut request = publish_request(7);
        request.creator = "alice".into();
        let err = publish_task(InternalAuth, State(state), ApiJson(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_regression_is_409() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(9)))
            .await
            .unwrap();
        update_status(
            InternalAuth,
            State(state.clone()),
            ApiPath(9),
            ApiJson(UpdateStatusRequest {
                status: TaskStatus::Cancelled,
            }),
        )
        .await
        .unwrap();

        let err = update_status(
            InternalAuth,
            State(state),
            ApiPath(9),
            ApiJson(UpdateStatusRequest {
                status: TaskStatus::Open,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "invalid_task_state");
    }

    #[tokio::test]
    async fn view_serializes_flat_camel_case() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(4)))
            .await
            .unwrap();
        let Json(view) = get_task(State(state), ApiPath(4)).await.unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["taskId"], 4);
        assert_eq!(json["status"], "Open");
        assert_eq!(json["hasContactKey"], false);
    }

    #[tokio::test]
    async fn contacts_after_acceptance_are_wrapped_for_both() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        register_key(&state, ALICE);
        let bob_keys = register_key(&state, BOB);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(12)))
            .await
            .unwrap();

        let Json(accepted) = accept_task(
            InternalAuth,
            State(state.clone()),
            ApiPath(12),
            ApiJson(AcceptTaskRequest { helper: BOB.into() }),
        )
        .await
        .unwrap();
        assert!(!accepted.helper_wrapped);
        assert!(accepted.helper_wrap_error.is_none());

        let (_, Json(created)) = create_contacts(
            InternalAuth,
            State(state.clone()),
            ApiPath(12),
            ApiJson(CreateContactsRequest {
                contacts: "tg:@alice".into(),
            }),
        )
        .await
        .unwrap();
        let helper_dek = created.helper_wrapped_dek.expect("helper wrapped on creation");
        assert_eq!(
            decrypt_contacts(&helper_dek, &bob_keys.secret, &created.encrypted_payload).unwrap(),
            "tg:@alice"
        );
    }

    #[tokio::test]
    async fn accept_stands_when_helper_has_no_key() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        register_key(&state, ALICE);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(13)))
            .await
            .unwrap();
        create_contacts(
            InternalAuth,
            State(state.clone()),
            ApiPath(13),
            ApiJson(CreateContactsRequest {
                contacts: "tg:@alice".into(),
            }),
        )
        .await
        .unwrap();

        let Json(accepted) = accept_task(
            InternalAuth,
            State(state.clone()),
            ApiPath(13),
            ApiJson(AcceptTaskRequest { helper: BOB.into() }),
        )
        .await
        .expect("acceptance is recorded");
        assert_eq!(accepted.task.status, TaskStatus::InProgress);
        assert!(!accepted.helper_wrapped);
        assert_eq!(accepted.helper_wrap_error.as_deref(), Some("missing_public_key"));

        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["helperWrapError"], "missing_public_key");
        assert_eq!(json["taskId"], 13);

        // Once the helper registers, the explicit retry succeeds.
        let bob_keys = register_key(&state, BOB);
        let Json(wrapped) = helper_wrap(InternalAuth, State(state.clone()), ApiPath(13))
            .await
            .expect("retry succeeds");
        let helper_dek = wrapped.helper_wrapped_dek.expect("helper wrap present");
        assert_eq!(
            decrypt_contacts(&helper_dek, &bob_keys.secret, &wrapped.encrypted_payload).unwrap(),
            "tg:@alice"
        );
    }

    #[tokio::test]
    async fn completing_task_drops_escrow() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        register_key(&state, ALICE);
        publish_task(InternalAuth, State(state.clone()), ApiJson(publish_request(14)))
            .await
            .unwrap();
        create_contacts(
            InternalAuth,
            State(state.clone()),
            ApiPath(14),
            ApiJson(CreateContactsRequest {
                contacts: "tg:@alice".into(),
            }),
        )
        .await
        .unwrap();
        // The helper never registers, so the wrap never happens.
        accept_task(
            InternalAuth,
            State(state.clone()),
            ApiPath(14),
            ApiJson(AcceptTaskRequest { helper: BOB.into() }),
        )
        .await
        .unwrap();

        update_status(
            InternalAuth,
            State(state.clone()),
            ApiPath(14),
            ApiJson(UpdateStatusRequest {
                status: TaskStatus::Completed,
            }),
        )
        .await
        .unwrap();

        let record = state
            .db
            .get_contact_key(&TaskKey::new(state.chain_id(), 14))
            .unwrap()
            .unwrap();
        assert!(record.escrowed_dek.is_none());
    }
}
