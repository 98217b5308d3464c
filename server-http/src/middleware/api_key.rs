use crate::api::responses::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Compares in time independent of where the first mismatching byte is.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    bool::from(provided.ct_eq(expected))
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
}

/// Shared-secret gate for the `/api` routes.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided = match request.headers().get(API_KEY_HEADER) {
        Some(value) if !value.is_empty() => value,
        _ => {
            warn!("Rejected {} {}: missing API key", request.method(), request.uri().path());
            return Err(unauthorized("API key is required"));
        }
    };

    if !keys_match(provided.as_bytes(), state.api_key.as_bytes()) {
        warn!("Rejected {} {}: invalid API key", request.method(), request.uri().path());
        return Err(unauthorized("Invalid API key"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"test-key", b"test-key"));
        assert!(!keys_match(b"test-kez", b"test-key"));
        assert!(!keys_match(b"test", b"test-key"));
        assert!(!keys_match(b"test-key-2", b"test-key"));
        assert!(!keys_match(b"TEST-KEY", b"test-key"));
    }
}
