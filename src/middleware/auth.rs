use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::AuthResult;
use crate::database::UserRecord;
use crate::error::ApiError;
use crate::server::AppState;

/// Authenticated user context, injected by `require_session`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub UserRecord);

/// Session authentication middleware that resolves the caller and injects `CurrentUser`
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match state.gate.resolve(request.headers()).await? {
        AuthResult::Authenticated(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        AuthResult::Unauthenticated => Err(ApiError::unauthorized("Not authenticated")),
        AuthResult::UserNotFound => Err(ApiError::not_found("User not found")),
    }
}
