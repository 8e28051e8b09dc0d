// handlers/auth/logout.rs - POST /auth/logout handler

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
};
use serde::Serialize;

use crate::middleware::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /auth/logout - Revoke the caller's session
///
/// Always succeeds, whether or not the request carried a valid session, so
/// repeated logouts are harmless. The session cookie is cleared with an
/// expired `Set-Cookie`.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "message": "Logged out successfully"
/// }
/// ```
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match state.sessions.read(&headers).await {
        Some(session) => {
            tracing::info!("Logging out user {} (session {})", session.subject, session.id)
        }
        None => tracing::debug!("Logout without an active session"),
    }

    let cleared = match state.sessions.revoke(&headers).await {
        Ok(value) => Some((header::SET_COOKIE, value)),
        Err(e) => {
            tracing::error!("Failed to build session revocation: {}", e);
            None
        }
    };

    (
        AppendHeaders(cleared),
        ApiResponse::success(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}
