// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    contacts::ContactRole,
    crypto::{EncryptedPayload, WrappedKey},
    error::ErrorBody,
    models::{Profile, Task, TaskStatus, WalletAddress},
    state::AppState,
};

pub mod contacts;
pub mod extract;
pub mod health;
pub mod profiles;
pub mod tasks;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/profiles", post(profiles::register_profile))
        .route("/profiles/{address}", get(profiles::get_profile))
        .route("/tasks", post(tasks::publish_task))
        .route("/tasks/{task_id}", get(tasks::get_task))
        .route("/tasks/{task_id}/accept", post(tasks::accept_task))
        .route("/tasks/{task_id}/status", put(tasks::update_status))
        .route("/tasks/{task_id}/contacts", post(tasks::create_contacts))
        .route("/tasks/{task_id}/helper-wrap", post(tasks::helper_wrap))
        .route("/contacts/challenge", post(contacts::issue_challenge))
        .route("/contacts/decrypt", post(contacts::decrypt_contacts))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Registers the bearer scheme used by indexer-only endpoints.
struct InternalTokenScheme;

impl Modify for InternalTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "internal_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        profiles::register_profile,
        profiles::get_profile,
        tasks::publish_task,
        tasks::get_task,
        tasks::accept_task,
        tasks::update_status,
        tasks::create_contacts,
        tasks::helper_wrap,
        contacts::issue_challenge,
        contacts::decrypt_contacts
    ),
    components(
        schemas(
            ErrorBody,
            Profile,
            Task,
            TaskStatus,
            WalletAddress,
            WrappedKey,
            EncryptedPayload,
            ContactRole,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            profiles::RegisterProfileRequest,
            tasks::PublishTaskRequest,
            tasks::AcceptTaskRequest,
            tasks::AcceptTaskResponse,
            tasks::UpdateStatusRequest,
            tasks::CreateContactsRequest,
            tasks::ContactKeyResponse,
            tasks::TaskView,
            contacts::ChallengeRequest,
            contacts::ChallengeResponse,
            contacts::DecryptRequest,
            contacts::DecryptResponse
        )
    ),
    modifiers(&InternalTokenScheme),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Profiles", description = "Encryption key registration"),
        (name = "Tasks", description = "Task mirror and key wrapping (indexer only)"),
        (name = "Contacts", description = "Signed contact disclosure")
    )
)]
pub struct ApiDoc;
