use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::core::store::types::ApiToken;
use crate::core::sync::SyncError;
use crate::interfaces::web::AppState;
use crate::interfaces::web::response::{ApiError, ErrorCode, success};

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub entry_ids: Option<Vec<i64>>,
}

pub async fn list_unimported(
    State(state): State<AppState>,
    Extension(token): Extension<ApiToken>,
) -> Result<Response, ApiError> {
    debug!(token_id = token.id, "Listing unimported entries");
    match state.sync.list_unimported().await {
        Ok(listing) => Ok(success(listing)),
        Err(SyncError::NoEntries) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NoEntriesToImport,
            "There are no entries for importing.",
        )),
        Err(e) => {
            error!("Failed to retrieve entries: {}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::FailedFetch,
                "Failed to fetch unimported entries.",
            ))
        }
    }
}

pub async fn mark_imported(
    State(state): State<AppState>,
    Extension(token): Extension<ApiToken>,
    payload: Result<Json<MarkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(token_id = token.id, "Rejected mark request body: {}", e);
        ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidRequest,
            "Invalid request format",
        )
    })?;

    let entry_ids = request.entry_ids.unwrap_or_default();
    debug!(token_id = token.id, count = entry_ids.len(), "Marking entries as imported");

    match state.sync.mark_imported(&entry_ids).await {
        Ok(report) => Ok(success(report)),
        Err(SyncError::MissingEntryIds) => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::MissingParams,
            SyncError::MissingEntryIds.to_string(),
        )),
        Err(SyncError::NoEntries) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NoEntriesToImport,
            "There are no entries to import.",
        )),
        Err(SyncError::Storage(e)) => {
            error!("Failed to mark entries as imported: {}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "An internal error occurred",
            ))
        }
    }
}
