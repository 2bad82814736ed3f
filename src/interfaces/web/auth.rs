use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use super::response::ApiError;

/// Rejects requests without a valid bearer token. On success the resolved
/// `ApiToken` is stored in the request extensions for handlers.
pub async fn require_token(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    match state.auth.authenticate(presented.as_deref()).await {
        Ok(token) => {
            req.extensions_mut().insert(token);
            next.run(req).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
