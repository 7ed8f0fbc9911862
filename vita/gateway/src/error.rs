use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vita_profiles::ProfileStoreError;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Prediction request without one or more required keys.
    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<String>),
    /// Payload present but not deserializable into the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// Training, prediction, or storage failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ProfileStoreError> for ApiError {
    fn from(err: ProfileStoreError) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": format!("Missing required fields: {fields:?}"),
                    "missing": fields,
                }),
            ),
            Self::InvalidPayload(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "success": false, "error": message }),
            ),
            Self::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": err.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
