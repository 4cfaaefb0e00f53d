use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::repository::{SessionRepository, StorageError};
use course_core::model::{AuthSession, AuthToken, UserProfile};

use super::SqliteRepository;

#[async_trait]
impl SessionRepository for SqliteRepository {
    async fn load_session(&self) -> Result<Option<AuthSession>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT token, user_json, saved_at
            FROM auth_session
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token: String = row
            .try_get("token")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let user_json: String = row
            .try_get("user_json")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let saved_at: DateTime<Utc> = row
            .try_get("saved_at")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        let token = AuthToken::new(token)
            .ok_or_else(|| StorageError::Serialization("stored token is blank".into()))?;
        let user: UserProfile = serde_json::from_str(&user_json)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(Some(AuthSession {
            token,
            user,
            saved_at,
        }))
    }

    async fn save_session(&self, session: &AuthSession) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO auth_session (id, token, user_json, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                user_json = excluded.user_json,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(session.token.expose())
        .bind(user_json)
        .bind(session.saved_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM auth_session WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
