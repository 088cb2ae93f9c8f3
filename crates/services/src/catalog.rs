use std::path::Path;

use rand::seq::IndexedRandom;
use reqwest::Client;

use quiz_core::model::{Item, Mode, ModeId};

use crate::error::CatalogError;

/// Read-only view over the loaded modes with filtering and uniform sampling.
///
/// The catalog is immutable for the session; the index never mutates the
/// supplied data.
pub struct CatalogIndex {
    modes: Vec<Mode>,
}

impl CatalogIndex {
    #[must_use]
    pub fn new(modes: Vec<Mode>) -> Self {
        Self { modes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    #[must_use]
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    #[must_use]
    pub fn mode_ids(&self) -> Vec<ModeId> {
        self.modes.iter().map(|mode| mode.id().clone()).collect()
    }

    /// Uniformly samples one mode among those both selected and present in
    /// the catalog. Selected ids with no catalog entry are ignored.
    #[must_use]
    pub fn sample_mode(&self, selected: &[ModeId]) -> Option<&Mode> {
        let pool: Vec<&Mode> = self
            .modes
            .iter()
            .filter(|mode| selected.contains(mode.id()))
            .collect();
        pool.choose(&mut rand::rng()).copied()
    }

    /// Uniformly samples one item from the given mode.
    #[must_use]
    pub fn sample_item<'a>(&self, mode: &'a Mode) -> Option<&'a Item> {
        mode.items().choose(&mut rand::rng())
    }
}

/// Fetches and parses the static catalog.
///
/// Non-2xx responses and malformed bodies are typed errors; the caller
/// treats either as an empty catalog and surfaces the message to the UI.
///
/// # Errors
///
/// Returns `CatalogError` on transport failure, non-success status, or a
/// body that does not parse as a mode list.
pub async fn fetch_catalog(client: &Client, url: &str) -> Result<Vec<Mode>, CatalogError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(CatalogError::HttpStatus(response.status()));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Loads a catalog from a local JSON file.
///
/// # Errors
///
/// Returns `CatalogError` if the file cannot be read or parsed.
pub fn load_catalog_file(path: &Path) -> Result<Vec<Mode>, CatalogError> {
    let body = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogIndex {
        let modes: Vec<Mode> = serde_json::from_str(
            r#"[
                {"id": "birds", "items": [{"url": "a.mp3", "answer": "robin"}]},
                {"id": "frogs", "items": [{"url": "b.mp3", "answer": "peeper"}]},
                {"id": "hollow", "items": []}
            ]"#,
        )
        .unwrap();
        CatalogIndex::new(modes)
    }

    #[test]
    fn sampling_respects_the_selection() {
        let index = catalog();
        let selected = vec![ModeId::new("birds")];

        for _ in 0..32 {
            let mode = index.sample_mode(&selected).unwrap();
            assert_eq!(mode.id().as_str(), "birds");
        }
    }

    #[test]
    fn selection_with_no_catalog_entry_yields_none() {
        let index = catalog();
        let selected = vec![ModeId::new("whales")];
        assert!(index.sample_mode(&selected).is_none());
    }

    #[test]
    fn empty_selection_yields_none() {
        let index = catalog();
        assert!(index.sample_mode(&[]).is_none());
    }

    #[test]
    fn sampling_an_empty_mode_yields_no_item() {
        let index = catalog();
        let selected = vec![ModeId::new("hollow")];
        let mode = index.sample_mode(&selected).unwrap();
        assert!(index.sample_item(mode).is_none());
    }

    #[test]
    fn missing_catalog_file_is_a_typed_error() {
        let err = load_catalog_file(Path::new("no-such-catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[test]
    fn catalog_parses_name_keyed_modes() {
        let modes: Vec<Mode> =
            serde_json::from_str(r#"[{"name": "birds", "items": []}]"#).unwrap();
        assert_eq!(modes[0].id().as_str(), "birds");
    }
}
