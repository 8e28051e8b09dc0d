use axum::http::HeaderMap;
use std::sync::Arc;

use crate::database::{DatabaseError, UserDirectory, UserRecord};
use crate::session::SessionStore;

/// Outcome of resolving a request to an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated(UserRecord),
    /// No session, or the session failed verification
    Unauthenticated,
    /// Session is valid but its subject has no user record
    UserNotFound,
}

/// Resolves requests to an authenticated user via the session store and user directory
#[derive(Clone)]
pub struct AuthGate {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
}

impl AuthGate {
    pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { sessions, users }
    }

    /// Lookup failures are returned as errors rather than folded into `UserNotFound`.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<AuthResult, DatabaseError> {
        let Some(session) = self.sessions.read(headers).await else {
            return Ok(AuthResult::Unauthenticated);
        };

        match self.users.find_user(session.subject).await? {
            Some(user) => {
                tracing::debug!("Session {} resolved to user {}", session.id, user.id);
                Ok(AuthResult::Authenticated(user))
            }
            None => {
                tracing::warn!(
                    "Session {} references missing user {}",
                    session.id,
                    session.subject
                );
                Ok(AuthResult::UserNotFound)
            }
        }
    }
}
