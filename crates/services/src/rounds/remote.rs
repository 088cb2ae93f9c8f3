use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{ModeId, Preferences, SessionStats};

use crate::audio::AudioSequencer;
use crate::client::{RemoteRound, RemoteStats, RoundApi};
use crate::error::EngineError;
use crate::rounds::engine::{GuessRejection, RoundPhase};

/// Result of a guess submitted to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteGuessOutcome {
    Evaluated {
        correct: bool,
        correct_label: Option<String>,
        attempt_number: Option<u32>,
        streak: u32,
    },
    Rejected(GuessRejection),
}

/// Round engine backed by the server: the server mints rounds, holds the
/// answers, and judges guesses.
///
/// A wrong verdict keeps the current round so the player can try again; only
/// a correct verdict advances. At most one guess is in flight at a time, and
/// a guess arriving while one is pending is rejected, never queued.
pub struct RemoteRoundEngine {
    api: Arc<dyn RoundApi>,
    sequencer: AudioSequencer,
    clock: Clock,
    stats: SessionStats,
    difficulties: Vec<String>,
    option_count: u32,
    preferences: Preferences,
    current: Option<RemoteRound>,
    in_flight: bool,
    phase: RoundPhase,
}

impl RemoteRoundEngine {
    #[must_use]
    pub fn new(api: Arc<dyn RoundApi>, sequencer: AudioSequencer, preferences: Preferences) -> Self {
        Self::with_clock(api, sequencer, preferences, Clock::default())
    }

    #[must_use]
    pub fn with_clock(
        api: Arc<dyn RoundApi>,
        sequencer: AudioSequencer,
        preferences: Preferences,
        clock: Clock,
    ) -> Self {
        Self {
            api,
            sequencer,
            clock,
            stats: SessionStats::new(),
            difficulties: Vec::new(),
            option_count: 0,
            preferences: preferences.sanitized(),
            current: None,
            in_flight: false,
            phase: RoundPhase::default(),
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
    pub fn current_round(&self) -> Option<&RemoteRound> {
        self.current.as_ref()
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences.sanitized();
    }

    /// Starts a server session and fetches the first round.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoModesSelected` for an empty difficulty
    /// selection and `EngineError::Client` when the server refuses.
    pub async fn start(
        &mut self,
        difficulties: Vec<String>,
        option_count: u32,
    ) -> Result<(), EngineError> {
        if difficulties.is_empty() {
            return Err(EngineError::NoModesSelected);
        }
        let round = self.api.start_round(&difficulties, option_count).await?;
        self.difficulties = difficulties;
        self.option_count = option_count;
        self.stats = SessionStats::new();
        self.current = Some(round);
        self.phase = RoundPhase::Ready;
        Ok(())
    }

    /// Plays the current round's audio. Replaying is allowed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoModesSelected` before `start` and playback
    /// errors from the backend; a failure keeps the round.
    pub async fn play(&mut self) -> Result<(), EngineError> {
        let Some(round) = self.current.as_ref() else {
            return Err(EngineError::NoModesSelected);
        };
        let url = round.audio_url.clone();
        let volume = self.preferences.volume;
        let rate = self.preferences.rate;

        self.phase = RoundPhase::Playing;
        let result = self.sequencer.play_primary(&url, volume, rate).await;
        self.phase = RoundPhase::AwaitingGuess;
        result?;
        Ok(())
    }

    /// Submits a guess and applies the server's verdict.
    ///
    /// Correct: local stats record the win, the feedback cue fires, and the
    /// next round replaces the current one. Wrong: the round stays, the
    /// deferred cue fires, and another attempt is expected.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Client` when the server rejects the guess or
    /// the follow-up round fetch fails; local stats are untouched then.
    pub async fn guess(&mut self, guess: &str) -> Result<RemoteGuessOutcome, EngineError> {
        if self.in_flight {
            return Ok(RemoteGuessOutcome::Rejected(GuessRejection::Busy));
        }
        if self.preferences.listening_mode {
            return Ok(RemoteGuessOutcome::Rejected(GuessRejection::ListeningMode));
        }
        if !matches!(self.phase, RoundPhase::Playing | RoundPhase::AwaitingGuess) {
            return Ok(RemoteGuessOutcome::Rejected(GuessRejection::NotAwaitingGuess));
        }
        let Some(round) = self.current.as_ref() else {
            return Ok(RemoteGuessOutcome::Rejected(GuessRejection::NoCurrentItem));
        };
        let round_id = round.id.clone();
        let mode = round
            .difficulty
            .clone()
            .map_or_else(|| ModeId::new("remote"), ModeId::new);

        self.in_flight = true;
        let verdict = self.api.guess(&round_id, guess).await;
        self.in_flight = false;
        let verdict = verdict?;

        self.stats.record(
            self.clock.now(),
            mode,
            verdict.correct_label.clone().unwrap_or_default(),
            guess,
            verdict.correct,
        );
        self.sequencer.play_cue(
            &verdict.feedback_audio,
            self.preferences.volume,
            !verdict.correct,
        );
        let streak = self.stats.streak();

        if verdict.correct {
            self.phase = RoundPhase::Feedback;
            let next = self
                .api
                .next_round(&self.difficulties, self.option_count)
                .await?;
            self.current = Some(next);
            self.phase = RoundPhase::Ready;
        } else {
            // Round stays open for another attempt.
            self.phase = RoundPhase::AwaitingGuess;
        }

        Ok(RemoteGuessOutcome::Evaluated {
            correct: verdict.correct,
            correct_label: verdict.correct_label,
            attempt_number: verdict.attempt_number,
            streak,
        })
    }

    /// Ends the session locally and tells the server, best effort.
    ///
    /// A failed end call is logged and swallowed; local state is already
    /// cleared by then.
    pub async fn end(&mut self) {
        self.sequencer.stop_all();
        self.phase = RoundPhase::Ended;
        if let Some(round) = self.current.take() {
            if let Err(err) = self.api.end_round(&round.id).await {
                tracing::warn!(round = %round.id, error = %err, "failed to end round on the server");
            }
        }
    }

    /// Resets server-side statistics and starts a fresh local session tally.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Client` if the server rejects the reset; local
    /// stats are kept in that case.
    pub async fn reset_stats(&mut self) -> Result<(), EngineError> {
        self.api.reset_stats().await?;
        self.stats = SessionStats::new();
        Ok(())
    }

    /// Fetches aggregated statistics from the server.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Client` on transport or server failure.
    pub async fn fetch_stats(&self) -> Result<RemoteStats, EngineError> {
        Ok(self.api.stats().await?)
    }
}
