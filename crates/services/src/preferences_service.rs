//! Load/save of player preferences through the storage layer.

use std::sync::Arc;

use quiz_core::model::Preferences;
use storage::repository::PreferencesRepository;

use crate::error::PreferencesServiceError;

/// Persists preferences as a single JSON payload under a fixed key.
///
/// Loading is lossy on purpose: a missing or corrupt payload yields defaults
/// instead of an error, so preferences can never block startup.
pub struct PreferencesService {
    repo: Arc<dyn PreferencesRepository>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(repo: Arc<dyn PreferencesRepository>) -> Self {
        Self { repo }
    }

    /// Loads stored preferences merged over defaults.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Storage` only when the store itself
    /// fails; absent or unreadable payloads fall back to defaults.
    pub async fn load(&self) -> Result<Preferences, PreferencesServiceError> {
        let payload = self.repo.load_preferences().await?;
        Ok(payload
            .as_deref()
            .map(Preferences::from_json_lossy)
            .unwrap_or_default())
    }

    /// Persists the full preferences record, unknown fields included.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError` on serialization or store failure.
    pub async fn save(&self, preferences: &Preferences) -> Result<(), PreferencesServiceError> {
        let payload = preferences.to_json()?;
        self.repo.save_preferences(&payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{ModeId, Theme};
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn missing_payload_yields_defaults() {
        let service = PreferencesService::new(Arc::new(InMemoryRepository::new()));
        let prefs = service.load().await.unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = PreferencesService::new(repo);

        let mut prefs = Preferences::default();
        prefs.theme = Theme::Light;
        prefs.volume = 0.4;
        prefs.modes.insert(ModeId::new("birds"));
        service.save(&prefs).await.unwrap();

        let loaded = service.load().await.unwrap();
        assert_eq!(loaded, prefs);
    }

    #[tokio::test]
    async fn corrupt_payload_yields_defaults() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.save_preferences("{not json").await.unwrap();

        let service = PreferencesService::new(repo);
        let prefs = service.load().await.unwrap();
        assert_eq!(prefs, Preferences::default());
    }
}
