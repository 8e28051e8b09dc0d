// handlers/auth/me.rs - GET /auth/me handler

use axum::Extension;
use serde::Serialize;

use crate::database::UserRecord;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserRecord,
}

/// GET /auth/me - Get the currently authenticated user
///
/// Runs behind `require_session`, which answers 401 when there is no valid
/// session and 404 when the session's user no longer exists.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "user": {
///     "id": "user_uuid",
///     "email": "user@example.com",
///     "name": "Display Name",
///     "createdAt": "2025-01-01T00:00:00Z"
///   }
/// }
/// ```
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<MeResponse> {
    Ok(ApiResponse::success(MeResponse { user }))
}
