// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::contacts::ContactError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// Error body returned by every endpoint.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        if err.is_internal() {
            tracing::error!(error = %err, "Request failed");
            return ApiError::internal();
        }
        ApiError::new(err.status_code(), err.code(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), "invalid_input", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(rejection.status(), "invalid_input", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::models::TaskKey;
    use crate::storage::DbError;
    use axum::body::to_bytes;

    #[test]
    fn contact_errors_keep_code_and_status() {
        let err = ApiError::from(ContactError::AlreadyWrapped(TaskKey::new(43113, 8)));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "already_wrapped");

        let err = ApiError::from(ContactError::Unauthorized);
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, "unauthorized");
    }

    #[test]
    fn challenge_cap_maps_to_429() {
        let err = ApiError::from(ContactError::TooManyChallenges);
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code, "too_many_challenges");
    }

    #[test]
    fn internal_details_are_not_echoed() {
        let err = ApiError::from(ContactError::Storage(DbError::NotFound("43113:8".into())));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("43113"));

        let err = ApiError::from(ContactError::from(CryptoError::EncryptionFailed));
        assert_eq!(err.code, "internal_error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","errorCode":"invalid_input"}"#);
    }
}
