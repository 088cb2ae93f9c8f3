use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::catalog::{Item, RawOption, scalar_id};

/// A normalized answer option assigned to one physical answer slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub label: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Candidate option-list keys probed on an item, in priority order.
const LIST_KEYS: [&str; 5] = ["options", "choices", "answers", "answerOptions", "variants"];

/// Identity keys probed on a structured option record, in priority order.
const OPTION_ID_KEYS: [&str; 7] = [
    "value",
    "answer",
    "id",
    "key",
    "code",
    "slug",
    "identifier",
];

/// Label keys probed on a structured option record, in priority order.
const OPTION_LABEL_KEYS: [&str; 6] = ["displayName", "label", "name", "text", "title", "caption"];

/// Label keys probed on the item itself when no option list is present.
const ITEM_LABEL_KEYS: [&str; 4] = ["displayName", "answerDisplayName", "label", "name"];

/// Canonical form used for every answer-identity comparison.
///
/// Option ids round-trip through string and numeric representations, so
/// correctness checks trim both sides and compare the exact remaining string.
#[must_use]
pub fn canonical_id(raw: &str) -> &str {
    raw.trim()
}

/// Reconciles an item's raw answer-option data into exactly `slot_count`
/// ordered slots.
///
/// The first non-empty candidate list wins. Entries with no recognizable
/// identity are skipped, duplicates keep their first occurrence, surplus
/// entries are truncated, and missing slots are filled from the corresponding
/// `fallback` entry. Pure over its inputs: normalizing the same item twice
/// yields the same sequence.
#[must_use]
pub fn normalize_options(
    item: &Item,
    slot_count: usize,
    fallback: &[AnswerOption],
) -> Vec<AnswerOption> {
    let candidates = match candidate_list(item) {
        Some(entries) => entries.iter().filter_map(normalize_entry).collect(),
        None => own_answer_candidates(item),
    };

    let mut slots: Vec<AnswerOption> = Vec::with_capacity(slot_count);
    for option in candidates {
        if slots.len() == slot_count {
            break;
        }
        if slots.iter().any(|existing| existing.id == option.id) {
            continue;
        }
        slots.push(option);
    }

    for index in slots.len()..slot_count {
        if let Some(default) = fallback.get(index) {
            slots.push(default.clone());
        }
    }

    slots
}

/// First non-empty raw list among the candidate keys.
fn candidate_list(item: &Item) -> Option<Vec<RawOption>> {
    for key in LIST_KEYS {
        let Some(Value::Array(entries)) = item.field(key) else {
            continue;
        };
        if entries.is_empty() {
            continue;
        }
        return Some(entries.iter().filter_map(RawOption::from_value).collect());
    }
    None
}

/// Two-part construction used when the item carries no option list: one
/// option from the item's own answer, then any `distractors` entries.
fn own_answer_candidates(item: &Item) -> Vec<AnswerOption> {
    let mut candidates = Vec::new();

    if let Some(id) = item.answer_id() {
        let label = ITEM_LABEL_KEYS
            .iter()
            .find_map(|key| item.field(key).and_then(scalar_id))
            .unwrap_or_else(|| id.clone());
        candidates.push(AnswerOption::new(id, label));
    }

    if let Some(Value::Array(entries)) = item.field("distractors") {
        candidates.extend(
            entries
                .iter()
                .filter_map(RawOption::from_value)
                .filter_map(|raw| normalize_entry(&raw)),
        );
    }

    candidates
}

/// Explicit match over the raw option shape.
///
/// Primitives are their own identity and label. Records go through the
/// priority-key tables; a record with no recognizable identity is dropped.
fn normalize_entry(raw: &RawOption) -> Option<AnswerOption> {
    match raw {
        RawOption::Text(text) => {
            let id = canonical_id(text);
            if id.is_empty() {
                return None;
            }
            Some(AnswerOption::new(id, id))
        }
        RawOption::Number(number) => {
            let id = number.to_string();
            Some(AnswerOption::new(id.clone(), id))
        }
        RawOption::Record(fields) => {
            let id = OPTION_ID_KEYS
                .iter()
                .find_map(|key| fields.get(*key).and_then(scalar_id))?;
            let label = OPTION_LABEL_KEYS
                .iter()
                .find_map(|key| fields.get(*key).and_then(scalar_id))
                .unwrap_or_else(|| id.clone());
            Some(AnswerOption::new(id, label))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fallback() -> Vec<AnswerOption> {
        vec![
            AnswerOption::new("f0", "Fallback 0"),
            AnswerOption::new("f1", "Fallback 1"),
            AnswerOption::new("f2", "Fallback 2"),
            AnswerOption::new("f3", "Fallback 3"),
        ]
    }

    #[test]
    fn primitive_list_normalizes_to_matching_id_and_label() {
        let item = Item::new("a.mp3", "robin")
            .with_field("options", json!(["robin", "sparrow", 3]));

        let slots = normalize_options(&item, 3, &fallback());

        assert_eq!(
            slots,
            vec![
                AnswerOption::new("robin", "robin"),
                AnswerOption::new("sparrow", "sparrow"),
                AnswerOption::new("3", "3"),
            ]
        );
    }

    #[test]
    fn record_list_resolves_priority_keys() {
        let item = Item::new("a.mp3", "robin").with_field(
            "choices",
            json!([
                {"value": "robin", "displayName": "Robin"},
                {"id": "sparrow", "label": "Sparrow"},
                {"code": "wren", "title": "Wren"},
            ]),
        );

        let slots = normalize_options(&item, 3, &fallback());

        assert_eq!(
            slots,
            vec![
                AnswerOption::new("robin", "Robin"),
                AnswerOption::new("sparrow", "Sparrow"),
                AnswerOption::new("wren", "Wren"),
            ]
        );
    }

    #[test]
    fn record_without_label_uses_id_as_label() {
        let item = Item::new("a.mp3", "robin")
            .with_field("options", json!([{"value": "robin"}]));

        let slots = normalize_options(&item, 1, &fallback());
        assert_eq!(slots, vec![AnswerOption::new("robin", "robin")]);
    }

    #[test]
    fn malformed_records_are_skipped_not_substituted() {
        // A record with no recognizable identity disappears entirely; the
        // remaining raw entries keep their slots and padding only fills the tail.
        let item = Item::new("a.mp3", "robin").with_field(
            "options",
            json!([
                {"comment": "no identity here"},
                "robin",
                {"value": ""},
                "sparrow",
            ]),
        );

        let slots = normalize_options(&item, 3, &fallback());

        assert_eq!(
            slots,
            vec![
                AnswerOption::new("robin", "robin"),
                AnswerOption::new("sparrow", "sparrow"),
                AnswerOption::new("f2", "Fallback 2"),
            ]
        );
    }

    #[test]
    fn empty_candidate_lists_fall_through_to_item_answer() {
        let item = Item::new("a.mp3", "robin")
            .with_field("options", json!([]))
            .with_field("answerDisplayName", json!("The Robin"))
            .with_field("distractors", json!(["sparrow", "wren"]));

        let slots = normalize_options(&item, 3, &fallback());

        assert_eq!(
            slots,
            vec![
                AnswerOption::new("robin", "The Robin"),
                AnswerOption::new("sparrow", "sparrow"),
                AnswerOption::new("wren", "wren"),
            ]
        );
    }

    #[test]
    fn duplicates_keep_first_occurrence_and_pad_with_fallback() {
        let item = Item::new("a.mp3", "robin")
            .with_field("options", json!(["robin", "sparrow", "robin"]));

        let slots = normalize_options(&item, 3, &fallback());

        assert_eq!(
            slots,
            vec![
                AnswerOption::new("robin", "robin"),
                AnswerOption::new("sparrow", "sparrow"),
                AnswerOption::new("f2", "Fallback 2"),
            ]
        );
    }

    #[test]
    fn surplus_options_are_truncated() {
        let item = Item::new("a.mp3", "robin")
            .with_field("options", json!(["a", "b", "c", "d", "e"]));

        let slots = normalize_options(&item, 3, &fallback());
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].id, "c");
    }

    #[test]
    fn absent_options_use_answer_then_fallback_padding() {
        let item = Item::new("a.mp3", "robin");

        let slots = normalize_options(&item, 4, &fallback());

        assert_eq!(slots[0], AnswerOption::new("robin", "robin"));
        assert_eq!(slots[1], AnswerOption::new("f1", "Fallback 1"));
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn candidate_keys_resolve_in_priority_order() {
        let item = Item::new("a.mp3", "robin")
            .with_field("variants", json!(["from-variants"]))
            .with_field("choices", json!(["from-choices"]));

        let slots = normalize_options(&item, 1, &fallback());
        assert_eq!(slots[0].id, "from-choices");
    }

    #[test]
    fn normalization_is_deterministic() {
        let item = Item::new("a.mp3", "robin").with_field(
            "answers",
            json!([{"key": "a", "text": "A"}, {"slug": "b"}, 7]),
        );

        let first = normalize_options(&item, 4, &fallback());
        let second = normalize_options(&item, 4, &fallback());
        assert_eq!(first, second);
    }

    #[test]
    fn all_slots_have_unique_non_empty_ids() {
        let shapes = [
            Item::new("a.mp3", "robin").with_field("options", json!(["x", "x", "", "y"])),
            Item::new("a.mp3", "robin").with_field(
                "choices",
                json!([{"value": "x"}, {"id": "x"}, {"comment": true}]),
            ),
            Item::new("a.mp3", "robin"),
        ];

        for item in &shapes {
            let slots = normalize_options(item, 4, &fallback());
            assert_eq!(slots.len(), 4);
            for (index, slot) in slots.iter().enumerate() {
                assert!(!slot.id.is_empty());
                assert!(
                    slots[..index].iter().all(|other| other.id != slot.id),
                    "duplicate id {} in {slots:?}",
                    slot.id
                );
            }
        }
    }
}
