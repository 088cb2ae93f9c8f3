use quiz_core::Clock;
use quiz_core::model::{
    AnswerOption, Item, ModeId, Preferences, SessionStats, canonical_id, normalize_options,
};

use crate::audio::AudioSequencer;
use crate::catalog::CatalogIndex;
use crate::error::EngineError;

/// Lifecycle phase of the engine. Transitions only happen through the
/// operations below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Idle,
    Ready,
    Playing,
    AwaitingGuess,
    Feedback,
    Ended,
}

/// One sampled round: the chosen mode, its item, and the normalized options
/// presented to the player.
#[derive(Debug, Clone)]
pub struct Round {
    pub mode: ModeId,
    pub item: Item,
    pub options: Vec<AnswerOption>,
}

/// Result of an accepted guess.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessOutcome {
    Evaluated {
        correct: bool,
        correct_answer: String,
        streak: u32,
    },
    Rejected(GuessRejection),
}

/// Why a guess was discarded without being evaluated.
///
/// Rejections are first-come-first-served: a guess arriving while another is
/// being processed is dropped, never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessRejection {
    NotAwaitingGuess,
    ListeningMode,
    NoCurrentItem,
    Busy,
}

/// Drives rounds from a static catalog: sample, play, evaluate, advance.
///
/// All state transitions are synchronous except `play`, which awaits the
/// audio backend. Guards reject out-of-phase operations as typed values
/// rather than panics, so a misbehaving frontend cannot corrupt the session.
pub struct RoundEngine {
    clock: Clock,
    catalog: CatalogIndex,
    sequencer: AudioSequencer,
    stats: SessionStats,
    preferences: Preferences,
    fallback_options: Vec<AnswerOption>,
    selected: Vec<ModeId>,
    slot_count: usize,
    phase: RoundPhase,
    busy: bool,
    current: Option<Round>,
}

impl RoundEngine {
    #[must_use]
    pub fn new(
        catalog: CatalogIndex,
        sequencer: AudioSequencer,
        preferences: Preferences,
        fallback_options: Vec<AnswerOption>,
    ) -> Self {
        Self::with_clock(
            catalog,
            sequencer,
            preferences,
            fallback_options,
            Clock::default(),
        )
    }

    #[must_use]
    pub fn with_clock(
        catalog: CatalogIndex,
        sequencer: AudioSequencer,
        preferences: Preferences,
        fallback_options: Vec<AnswerOption>,
        clock: Clock,
    ) -> Self {
        Self {
            clock,
            catalog,
            sequencer,
            stats: SessionStats::new(),
            preferences: preferences.sanitized(),
            fallback_options,
            selected: Vec::new(),
            slot_count: 0,
            phase: RoundPhase::default(),
            busy: false,
            current: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    #[must_use]
    pub fn current_round(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Replaces the active preferences. Takes effect from the next playback.
    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences.sanitized();
    }

    /// Begins a session over the selected modes and samples the first round.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoModesSelected` for an empty selection and
    /// `EngineError::EmptyCatalog` when none of the selected modes exist in
    /// the catalog. Neither failure touches session stats.
    pub fn start(&mut self, selected: Vec<ModeId>, slot_count: usize) -> Result<(), EngineError> {
        if selected.is_empty() {
            return Err(EngineError::NoModesSelected);
        }
        if self.catalog.sample_mode(&selected).is_none() {
            return Err(EngineError::EmptyCatalog);
        }
        self.selected = selected;
        self.slot_count = slot_count;
        self.stats = SessionStats::new();
        self.sample_next()
    }

    /// Discards the current round and samples a fresh one.
    ///
    /// # Errors
    ///
    /// Same failure modes as `start`; the current round is already gone when
    /// an error is returned.
    pub fn next(&mut self) -> Result<(), EngineError> {
        self.sample_next()
    }

    /// Skips the current round: resets the streak, records nothing.
    ///
    /// # Errors
    ///
    /// Same failure modes as `next`.
    pub fn skip(&mut self) -> Result<(), EngineError> {
        self.stats.reset_streak();
        self.sample_next()
    }

    /// Plays the current round's audio, sampling a round first if none is
    /// pending. Replaying the same round is allowed and restarts the tone.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoModesSelected` before `start`, sampling errors
    /// if a round must be drawn, and `EngineError::Playback` if the backend
    /// fails to start. A playback failure keeps the round so the player can
    /// retry.
    pub async fn play(&mut self) -> Result<(), EngineError> {
        if self.busy {
            return Ok(());
        }
        if matches!(self.phase, RoundPhase::Idle | RoundPhase::Ended) {
            return Err(EngineError::NoModesSelected);
        }
        if self.current.is_none() {
            self.sample_next()?;
        }
        let Some(round) = self.current.as_ref() else {
            return Err(EngineError::EmptyCatalog);
        };
        let url = round.item.url().to_string();
        let volume = self.preferences.volume;
        let rate = self.preferences.rate;

        self.phase = RoundPhase::Playing;
        let result = self.sequencer.play_primary(&url, volume, rate).await;
        self.phase = RoundPhase::AwaitingGuess;
        result?;
        Ok(())
    }

    /// Evaluates a guess against the current round.
    ///
    /// An accepted guess records a stats entry, triggers the feedback cue,
    /// and advances to a fresh round without auto-playing it. Identity
    /// comparison is canonical on both sides.
    ///
    /// # Errors
    ///
    /// Returns sampling errors from the advance; the guess itself is already
    /// recorded by then.
    pub fn answer(&mut self, option_id: &str) -> Result<GuessOutcome, EngineError> {
        if self.busy {
            return Ok(GuessOutcome::Rejected(GuessRejection::Busy));
        }
        if self.preferences.listening_mode {
            return Ok(GuessOutcome::Rejected(GuessRejection::ListeningMode));
        }
        if !matches!(self.phase, RoundPhase::Playing | RoundPhase::AwaitingGuess) {
            return Ok(GuessOutcome::Rejected(GuessRejection::NotAwaitingGuess));
        }
        let Some(round) = self.current.as_ref() else {
            return Ok(GuessOutcome::Rejected(GuessRejection::NoCurrentItem));
        };

        self.busy = true;
        self.phase = RoundPhase::Feedback;

        let correct_answer = round.item.answer_id().unwrap_or_default();
        let mode = round.mode.clone();
        let correct = canonical_id(option_id) == canonical_id(&correct_answer);

        self.stats.record(
            self.clock.now(),
            mode,
            correct_answer.clone(),
            option_id.trim(),
            correct,
        );
        self.sequencer
            .play_feedback(correct, self.preferences.volume);
        let streak = self.stats.streak();

        let advance = self.sample_next();
        self.busy = false;
        advance?;

        Ok(GuessOutcome::Evaluated {
            correct,
            correct_answer,
            streak,
        })
    }

    /// Ends the session: stops all audio and drops the round and selection.
    /// Stats survive until the next `start`.
    pub fn end(&mut self) {
        self.sequencer.stop_all();
        self.current = None;
        self.selected.clear();
        self.phase = RoundPhase::Ended;
    }

    /// Samples a mode and item, normalizes options, and installs the round.
    /// The previous round and its normalization are discarded first.
    fn sample_next(&mut self) -> Result<(), EngineError> {
        self.current = None;

        let Some(mode) = self.catalog.sample_mode(&self.selected) else {
            return Err(EngineError::EmptyCatalog);
        };
        let mode_id = mode.id().clone();
        let Some(item) = self.catalog.sample_item(mode) else {
            return Err(EngineError::ModeHasNoItems(mode_id));
        };
        let item = item.clone();

        let options = normalize_options(&item, self.slot_count, &self.fallback_options);
        self.current = Some(Round {
            mode: mode_id,
            item,
            options,
        });
        self.phase = RoundPhase::Ready;
        Ok(())
    }
}
