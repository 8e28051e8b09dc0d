// handlers/system/health.rs - GET /system/health handler

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// Whether each required configuration key is set
    pub env: BTreeMap<String, bool>,
    pub db: DatabaseStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /system/health - Configuration and database diagnostics
///
/// Never fails: a missing or broken database is reported in `db.error`
/// with a 200 response.
///
/// Expected Output:
/// ```json
/// {
///   "env": { "DATABASE_URL": true, "SESSION_SECRET": false },
///   "db": { "connected": false, "error": "Missing configuration: DATABASE_URL" }
/// }
/// ```
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let db = match state.database.health_check().await {
        Ok(()) => DatabaseStatus {
            connected: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            DatabaseStatus {
                connected: false,
                error: Some(e.to_string()),
            }
        }
    };

    Json(HealthReport {
        env: state.config.required.clone(),
        db,
    })
}
