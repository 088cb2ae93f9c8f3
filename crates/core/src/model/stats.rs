use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ModeId;

/// One recorded guess. Append-only and immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsEntry {
    pub timestamp: DateTime<Utc>,
    pub mode: ModeId,
    pub correct_answer: String,
    pub guess: String,
    pub correct: bool,
}

/// Correctness counters and guess history for the current session.
///
/// `correct` and `wrong` only ever grow within a session; the streak counts
/// consecutive correct guesses and resets on any wrong guess or explicit skip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    correct: u32,
    wrong: u32,
    streak: u32,
    history: Vec<StatsEntry>,
}

impl SessionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn history(&self) -> &[StatsEntry] {
        &self.history
    }

    /// Records a guess, updating counters and streak.
    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        mode: ModeId,
        correct_answer: impl Into<String>,
        guess: impl Into<String>,
        correct: bool,
    ) -> StatsEntry {
        if correct {
            self.correct = self.correct.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
        } else {
            self.wrong = self.wrong.saturating_add(1);
            self.streak = 0;
        }

        let entry = StatsEntry {
            timestamp,
            mode,
            correct_answer: correct_answer.into(),
            guess: guess.into(),
            correct,
        };
        self.history.push(entry.clone());
        entry
    }

    /// Explicit streak reset, used when a round is skipped.
    pub fn reset_streak(&mut self) {
        self.streak = 0;
    }

    /// Serializable copy of the full guess history, including the most
    /// recent entry.
    #[must_use]
    pub fn export_snapshot(&self) -> Vec<StatsEntry> {
        self.history.clone()
    }
}
