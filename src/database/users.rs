use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};

/// Public user fields returned by `/auth/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lookup service mapping a user id to its record
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError>;
}

/// UserDirectory backed by the `users` table
pub struct PgUserDirectory {
    database: Arc<DatabaseManager>,
}

impl PgUserDirectory {
    pub fn new(database: Arc<DatabaseManager>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        let pool = self.database.pool().await?;

        let query = r#"
            SELECT id, email, name, created_at
            FROM users
            WHERE id = $1
        "#;

        let user = sqlx::query_as::<_, UserRecord>(query)
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        Ok(user)
    }
}
