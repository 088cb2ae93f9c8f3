use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use quiz_core::model::{ModeId, StatsEntry};

use crate::repository::{GuessLogRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl GuessLogRepository for SqliteRepository {
    async fn append_guess(&self, entry: &StatsEntry) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO guesses (timestamp, mode, correct_answer, guess, is_correct)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(entry.timestamp.to_rfc3339())
        .bind(entry.mode.as_str())
        .bind(&entry.correct_answer)
        .bind(&entry.guess)
        .bind(i64::from(entry.correct))
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn list_guesses(&self) -> Result<Vec<StatsEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT timestamp, mode, correct_answer, guess, is_correct
            FROM guesses
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: String = row
                .try_get("timestamp")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|err| StorageError::Serialization(err.to_string()))?
                .with_timezone(&Utc);
            let mode: String = row
                .try_get("mode")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let correct_answer: String = row
                .try_get("correct_answer")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let guess: String = row
                .try_get("guess")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            let is_correct: i64 = row
                .try_get("is_correct")
                .map_err(|err| StorageError::Serialization(err.to_string()))?;

            entries.push(StatsEntry {
                timestamp,
                mode: ModeId::new(mode),
                correct_answer,
                guess,
                correct: is_correct != 0,
            });
        }

        Ok(entries)
    }
}
