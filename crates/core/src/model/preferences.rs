use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::ids::ModeId;

/// Color theme requested by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// Player preferences, persisted across sessions under a fixed key.
///
/// Loading always merges the stored payload over defaults: missing fields take
/// their default value, and unknown fields are carried in `extra` so that keys
/// written by a newer build survive a load/save round-trip through this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub volume: f64,
    pub rate: f64,
    pub listening_mode: bool,
    pub modes: BTreeSet<ModeId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            volume: 1.0,
            rate: 1.0,
            listening_mode: false,
            modes: BTreeSet::new(),
            extra: Map::new(),
        }
    }
}

impl Preferences {
    /// Parses a stored JSON payload, merging missing fields from defaults.
    ///
    /// A corrupt payload yields plain defaults; the stored value is then
    /// effectively discarded on the next save.
    #[must_use]
    pub fn from_json_lossy(payload: &str) -> Self {
        serde_json::from_str::<Self>(payload)
            .map(Self::sanitized)
            .unwrap_or_default()
    }

    /// Serializes the full record, including unknown carried-over fields.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Clamps out-of-range numeric fields instead of rejecting the payload.
    ///
    /// Volume lives in [0, 1]; a non-positive or non-finite rate falls back
    /// to 1.0.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !self.volume.is_finite() {
            self.volume = 1.0;
        }
        self.volume = self.volume.clamp(0.0, 1.0);
        if !self.rate.is_finite() || self.rate <= 0.0 {
            self.rate = 1.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_payload_falls_back_to_defaults() {
        let prefs = Preferences::from_json_lossy("{not json");
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn missing_fields_merge_from_defaults() {
        let prefs = Preferences::from_json_lossy(r#"{"volume": 0.5}"#);
        assert!((prefs.volume - 0.5).abs() < f64::EPSILON);
        assert!((prefs.rate - 1.0).abs() < f64::EPSILON);
        assert!(!prefs.listening_mode);
        assert_eq!(prefs.theme, Theme::Dark);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let payload = r#"{
            "theme": "light",
            "volume": 0.8,
            "listeningMode": true,
            "modes": ["birds"],
            "futureKnob": {"nested": 3}
        }"#;

        let loaded = Preferences::from_json_lossy(payload);
        assert_eq!(loaded.extra.get("futureKnob"), Some(&serde_json::json!({"nested": 3})));

        let saved = loaded.to_json().unwrap();
        let reloaded = Preferences::from_json_lossy(&saved);
        assert_eq!(reloaded, loaded);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let prefs = Preferences::from_json_lossy(r#"{"volume": 3.5, "rate": -1.0}"#);
        assert!((prefs.volume - 1.0).abs() < f64::EPSILON);
        assert!((prefs.rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn selected_modes_round_trip() {
        let mut prefs = Preferences::default();
        prefs.modes.insert(ModeId::new("birds"));
        prefs.modes.insert(ModeId::new("frogs"));

        let reloaded = Preferences::from_json_lossy(&prefs.to_json().unwrap());
        assert_eq!(reloaded.modes, prefs.modes);
    }
}
