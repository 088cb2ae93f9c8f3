mod catalog;
mod ids;
mod options;
mod preferences;
mod stats;

pub use catalog::{Item, Mode, RawOption};
pub use ids::{ModeId, RoundId};
pub use options::{AnswerOption, canonical_id, normalize_options};
pub use preferences::{Preferences, Theme};
pub use stats::{SessionStats, StatsEntry};
