use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::core::auth::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingToken,
    MalformedToken,
    InvalidToken,
    MissingParams,
    InvalidRequest,
    InternalError,
    NoEntriesToImport,
    FailedFetch,
}

/// Body shape shared by every API response.
#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            code: None,
            message: None,
            data: Some(data),
        }),
    )
        .into_response()
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            code: Some(self.code),
            message: Some(self.message),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::MissingToken => ErrorCode::MissingToken,
            AuthError::MalformedToken => ErrorCode::MalformedToken,
            AuthError::InvalidToken(cause) => {
                debug!(?cause, "Token rejected");
                ErrorCode::InvalidToken
            }
            AuthError::Storage(e) => {
                error!("Token lookup failed: {}", e);
                return ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    "An internal error occurred",
                );
            }
        };
        ApiError::new(StatusCode::UNAUTHORIZED, code, err.to_string())
    }
}
