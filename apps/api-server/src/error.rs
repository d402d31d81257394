//! Mapping of domain errors onto HTTP responses, plus the JSON body extractor
//! that reports malformed input with the same error envelope.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::CoreError;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// Body could not be read or deserialized.
    BadBody(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Core(CoreError::NotFound { .. }) => "not_found",
            ApiError::Core(CoreError::Conflict { .. }) => "conflict",
            ApiError::Core(CoreError::Invalid(_)) | ApiError::BadBody(_) => "invalid_request",
            ApiError::Core(CoreError::Repository(_)) => "internal",
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Core(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadBody(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = StatusCode::from_u16(http_common::status_for_error_code(code))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match self {
            ApiError::Core(CoreError::Repository(detail)) => {
                error!(err = %detail, "repository failure");
                // Internal detail stays in the logs.
                "Internal server error".to_string()
            }
            ApiError::Core(e) => {
                warn!(code, err = %e, "request rejected");
                e.to_string()
            }
            ApiError::BadBody(detail) => {
                warn!(code, err = %detail, "bad request body");
                detail
            }
        };
        (status, Json(http_common::error_envelope(code, &message))).into_response()
    }
}

/// `Json<T>` whose rejection is an [`ApiError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
