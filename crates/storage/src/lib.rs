#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    GuessLogRepository, InMemoryRepository, PREFERENCES_KEY, PreferencesRepository, Storage,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
