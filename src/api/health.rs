// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Whether the contact database answers a read transaction.
    pub database: String,
    /// Whether internal (indexer) endpoints are enabled.
    pub internal_api: String,
}

/// Simple health check response for liveness checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Returns 200 if the database is reachable, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database_ok = match state.db.health_check() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
    };
    let internal_api = if state.settings.internal_api_token.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    let response = ReadyResponse {
        status: if database_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            database: if database_ok { "ok" } else { "unavailable" }.to_string(),
            internal_api: internal_api.to_string(),
        },
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness check handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check handler.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use crate::auth::ChallengePolicy;

    #[tokio::test]
    async fn reports_database_ok() {
        let (state, _dir) = test_state(ChallengePolicy::Static);
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.checks.database, "ok");
        assert_eq!(body.checks.internal_api, "enabled");
    }

    #[tokio::test]
    async fn liveness_is_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }
}
