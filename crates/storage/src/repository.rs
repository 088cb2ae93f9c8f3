use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::StatsEntry;

/// Fixed namespaced key the preferences payload is stored under.
pub const PREFERENCES_KEY: &str = "tonequiz.preferences";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value access to the persisted preferences payload.
///
/// The payload is opaque JSON; merge-with-defaults semantics live in
/// `quiz_core::model::Preferences`, not here.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    /// Fetch the raw payload stored under [`PREFERENCES_KEY`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn load_preferences(&self) -> Result<Option<String>, StorageError>;

    /// Overwrite the stored payload. Preferences are never deleted, only
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be written.
    async fn save_preferences(&self, payload: &str) -> Result<(), StorageError>;
}

/// Append-only log of evaluated guesses, persisted across sessions.
#[async_trait]
pub trait GuessLogRepository: Send + Sync {
    /// Append one evaluated guess and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_guess(&self, entry: &StatsEntry) -> Result<i64, StorageError>;

    /// All recorded guesses in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    async fn list_guesses(&self) -> Result<Vec<StatsEntry>, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub preferences: Arc<dyn PreferencesRepository>,
    pub guesses: Arc<dyn GuessLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let preferences: Arc<dyn PreferencesRepository> = Arc::new(repo.clone());
        let guesses: Arc<dyn GuessLogRepository> = Arc::new(repo);
        Self {
            preferences,
            guesses,
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    values: Arc<Mutex<HashMap<String, String>>>,
    guesses: Arc<Mutex<Vec<StatsEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryRepository {
    async fn load_preferences(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(PREFERENCES_KEY).cloned())
    }

    async fn save_preferences(&self, payload: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(PREFERENCES_KEY.to_string(), payload.to_string());
        Ok(())
    }
}

#[async_trait]
impl GuessLogRepository for InMemoryRepository {
    async fn append_guess(&self, entry: &StatsEntry) -> Result<i64, StorageError> {
        let mut guard = self
            .guesses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(entry.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_guesses(&self) -> Result<Vec<StatsEntry>, StorageError> {
        let guard = self
            .guesses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}
