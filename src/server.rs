use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthGate;
use crate::config::{AppConfig, Environment};
use crate::database::{DatabaseManager, PgUserDirectory, UserDirectory};
use crate::handlers;
use crate::middleware::require_session;
use crate::session::{CookieSessionStore, SessionStore};

/// Shared handler dependencies, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Arc<DatabaseManager>,
    pub sessions: Arc<dyn SessionStore>,
    pub gate: AuthGate,
}

impl AppState {
    /// Wire the production collaborators from configuration
    pub fn from_config(config: AppConfig) -> Self {
        let database = Arc::new(DatabaseManager::new(config.database.clone()));
        let sessions: Arc<dyn SessionStore> = Arc::new(CookieSessionStore::new(&config.security));
        let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(database.clone()));
        Self::with_parts(config, database, sessions, users)
    }

    /// Build state around injected collaborators
    pub fn with_parts(
        config: AppConfig,
        database: Arc<DatabaseManager>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            gate: AuthGate::new(sessions.clone(), users),
            sessions,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(system_routes())
        .with_state(state)
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(state: AppState) -> Router<AppState> {
    use handlers::auth;

    let protected = Router::new()
        .route("/auth/me", get(auth::session_me))
        .route_layer(from_fn_with_state(state, require_session));

    Router::new()
        .route("/auth/logout", post(auth::session_logout))
        .merge(protected)
}

fn system_routes() -> Router<AppState> {
    use handlers::system;

    Router::new().route("/system/health", get(system::system_health))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
