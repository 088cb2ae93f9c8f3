use async_trait::async_trait;
use sqlx::Row;

use crate::repository::{PREFERENCES_KEY, PreferencesRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl PreferencesRepository for SqliteRepository {
    async fn load_preferences(&self) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT payload FROM kv_store WHERE key = ?1")
            .bind(PREFERENCES_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        row.try_get::<String, _>("payload")
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn save_preferences(&self, payload: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_store (key, payload)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET payload = excluded.payload
            ",
        )
        .bind(PREFERENCES_KEY)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
