use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::model::ids::ModeId;

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// A named bucket of playable quiz items, immutable once loaded for the session.
#[derive(Debug, Clone, Deserialize)]
pub struct Mode {
    #[serde(alias = "name")]
    id: ModeId,
    #[serde(default)]
    items: Vec<Item>,
}

impl Mode {
    #[must_use]
    pub fn new(id: ModeId, items: Vec<Item>) -> Self {
        Self { id, items }
    }

    #[must_use]
    pub fn id(&self) -> &ModeId {
        &self.id
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// Identity keys probed on the item itself, after `answer`, in priority order.
const ITEM_ANSWER_KEYS: [&str; 4] = ["value", "id", "soundId", "name"];

/// One playable unit with a canonical answer and optional raw option data.
///
/// Catalog items arrive in several historical shapes. Everything beyond `url`
/// and `answer` is kept as raw JSON fields and interpreted by the normalizer,
/// which probes them through typed priority tables.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    url: String,
    #[serde(default)]
    answer: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Item {
    #[must_use]
    pub fn new(url: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            answer: Some(Value::String(answer.into())),
            extra: Map::new(),
        }
    }

    /// Attaches a raw catalog field, mainly for fixtures and tests.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw catalog field lookup.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// The item's canonical answer identity.
    ///
    /// Prefers the `answer` field; older catalog shapes carried the identity
    /// under `value`, `id`, `soundId` or `name` instead.
    #[must_use]
    pub fn answer_id(&self) -> Option<String> {
        if let Some(id) = self.answer.as_ref().and_then(scalar_id) {
            return Some(id);
        }
        ITEM_ANSWER_KEYS
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(scalar_id))
    }
}

//
// ─── RAW OPTION ────────────────────────────────────────────────────────────────
//

/// Raw answer-option data as it appears in catalog items.
///
/// Primitive entries carry their own identity; records are probed through the
/// normalizer's priority-key tables.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOption {
    Text(String),
    Number(Number),
    Record(Map<String, Value>),
}

impl RawOption {
    /// Classifies a JSON value as option data.
    ///
    /// Booleans, nulls and nested arrays carry no usable option shape and
    /// yield `None`; the normalizer skips them.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(number) => Some(Self::Number(number.clone())),
            Value::Object(fields) => Some(Self::Record(fields.clone())),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        }
    }
}

/// Stringifies a scalar identity value; trims strings, rejects empties.
pub(crate) fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_accepts_name_alias() {
        let mode: Mode = serde_json::from_value(json!({
            "name": "birds",
            "items": [{"url": "a.mp3", "answer": "robin"}]
        }))
        .unwrap();
        assert_eq!(mode.id().as_str(), "birds");
        assert_eq!(mode.items().len(), 1);
    }

    #[test]
    fn answer_id_prefers_answer_over_legacy_keys() {
        let item: Item = serde_json::from_value(json!({
            "url": "a.mp3",
            "answer": "robin",
            "id": "legacy"
        }))
        .unwrap();
        assert_eq!(item.answer_id().as_deref(), Some("robin"));
    }

    #[test]
    fn answer_id_falls_back_to_sound_id() {
        let item: Item = serde_json::from_value(json!({
            "url": "a.mp3",
            "soundId": 42
        }))
        .unwrap();
        assert_eq!(item.answer_id().as_deref(), Some("42"));
    }

    #[test]
    fn raw_option_rejects_unusable_shapes() {
        assert_eq!(RawOption::from_value(&json!(null)), None);
        assert_eq!(RawOption::from_value(&json!(true)), None);
        assert_eq!(RawOption::from_value(&json!(["nested"])), None);
        assert!(matches!(
            RawOption::from_value(&json!("robin")),
            Some(RawOption::Text(_))
        ));
    }
}
