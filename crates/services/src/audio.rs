//! Non-overlapping sequencing of the primary tone and feedback cues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::PlaybackError;

/// Delay used when a deferred cue is requested after the primary tone has
/// already finished; absorbs "finished" events that race the request.
const CUE_RETRIGGER_DELAY: Duration = Duration::from_millis(150);

/// Starts playback and hands back a controllable handle.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Begin playing `url` at the given volume and rate.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if playback cannot start.
    async fn start(
        &self,
        url: &str,
        volume: f64,
        rate: f64,
    ) -> Result<Arc<dyn AudioHandle>, PlaybackError>;
}

/// A single in-flight playback.
#[async_trait]
pub trait AudioHandle: Send + Sync {
    /// Source identity this handle is bound to.
    fn source(&self) -> &str;

    /// Stop playback and release the underlying sink.
    fn stop(&self);

    /// True once playback has naturally reached its end.
    fn is_finished(&self) -> bool;

    /// Resolves once playback naturally reaches its end.
    async fn wait_finished(&self);
}

/// Cue sources played once a guess has been evaluated.
#[derive(Debug, Clone)]
pub struct FeedbackCues {
    pub correct: String,
    pub wrong: String,
}

struct PendingCue {
    task: JoinHandle<()>,
    /// Primary source the cue was bound to when it was scheduled.
    target: Option<String>,
}

/// Owns at most one primary playback handle and at most one pending feedback
/// cue, and keeps them from overlapping across rounds.
///
/// Starting a new primary playback cancels any pending cue before the new
/// handle exists, so a cue scheduled against an earlier round can never
/// sound during a later one.
pub struct AudioSequencer {
    output: Arc<dyn AudioOutput>,
    cues: FeedbackCues,
    primary: Option<Arc<dyn AudioHandle>>,
    pending_cue: Option<PendingCue>,
}

impl AudioSequencer {
    #[must_use]
    pub fn new(output: Arc<dyn AudioOutput>, cues: FeedbackCues) -> Self {
        Self {
            output,
            cues,
            primary: None,
            pending_cue: None,
        }
    }

    /// Source of the primary handle currently held, if any.
    #[must_use]
    pub fn primary_source(&self) -> Option<&str> {
        self.primary.as_deref().map(|handle| handle.source())
    }

    #[must_use]
    pub fn has_pending_cue(&self) -> bool {
        self.pending_cue.is_some()
    }

    /// Source identity the pending cue is bound to, if any.
    #[must_use]
    pub fn pending_cue_target(&self) -> Option<&str> {
        self.pending_cue
            .as_ref()
            .and_then(|cue| cue.target.as_deref())
    }

    /// Starts the primary tone, replacing any previous one.
    ///
    /// The pending cue is cancelled and the previous handle stopped before
    /// the new playback starts. A start failure leaves no dangling handle.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if playback cannot start; callers treat this
    /// as non-fatal and keep their round state.
    pub async fn play_primary(
        &mut self,
        url: &str,
        volume: f64,
        rate: f64,
    ) -> Result<(), PlaybackError> {
        self.cancel_pending();
        if let Some(previous) = self.primary.take() {
            previous.stop();
        }
        let handle = self.output.start(url, volume, rate).await?;
        self.primary = Some(handle);
        Ok(())
    }

    /// Plays the configured correct/wrong cue.
    ///
    /// The correct cue fires immediately and independently of the primary
    /// handle. The wrong cue is deferred so it cannot mask a tone the player
    /// is still listening to.
    pub fn play_feedback(&mut self, correct: bool, volume: f64) {
        let url = if correct {
            self.cues.correct.clone()
        } else {
            self.cues.wrong.clone()
        };
        self.play_cue(&url, volume, !correct);
    }

    /// Plays a cue, optionally deferring it until the primary tone finishes.
    ///
    /// A deferred cue is bound to the handle the sequencer holds right now;
    /// if the primary has already finished, it is scheduled after a short
    /// fixed delay instead. Either way it stays cancellable until it
    /// actually starts.
    pub fn play_cue(&mut self, url: &str, volume: f64, defer_until_primary_done: bool) {
        let output = Arc::clone(&self.output);
        let url = url.to_string();

        if !defer_until_primary_done {
            tokio::spawn(async move {
                if let Err(err) = output.start(&url, volume, 1.0).await {
                    tracing::warn!(%url, error = %err, "feedback cue failed to start");
                }
            });
            return;
        }

        self.cancel_pending();
        match self.primary.clone() {
            Some(handle) if !handle.is_finished() => {
                let target = handle.source().to_string();
                let task = tokio::spawn(async move {
                    handle.wait_finished().await;
                    if let Err(err) = output.start(&url, volume, 1.0).await {
                        tracing::warn!(%url, error = %err, "feedback cue failed to start");
                    }
                });
                self.pending_cue = Some(PendingCue {
                    task,
                    target: Some(target),
                });
            }
            primary => {
                let target = primary.map(|handle| handle.source().to_string());
                let task = tokio::spawn(async move {
                    tokio::time::sleep(CUE_RETRIGGER_DELAY).await;
                    if let Err(err) = output.start(&url, volume, 1.0).await {
                        tracing::warn!(%url, error = %err, "feedback cue failed to start");
                    }
                });
                self.pending_cue = Some(PendingCue { task, target });
            }
        }
    }

    /// Cancels any scheduled cue. Idempotent.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending_cue.take() {
            pending.task.abort();
        }
    }

    /// Stops everything: the pending cue first, then the primary handle.
    pub fn stop_all(&mut self) {
        self.cancel_pending();
        if let Some(handle) = self.primary.take() {
            handle.stop();
        }
    }
}

//
// ─── NULL OUTPUT ───────────────────────────────────────────────────────────────
//

/// No-op output for environments without an audio device.
///
/// Handles report their source and count as finished immediately, so the
/// engine's sequencing logic still runs end to end.
pub struct NullAudioOutput;

struct NullHandle {
    source: String,
}

#[async_trait]
impl AudioHandle for NullHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn stop(&self) {}

    fn is_finished(&self) -> bool {
        true
    }

    async fn wait_finished(&self) {}
}

#[async_trait]
impl AudioOutput for NullAudioOutput {
    async fn start(
        &self,
        url: &str,
        _volume: f64,
        _rate: f64,
    ) -> Result<Arc<dyn AudioHandle>, PlaybackError> {
        Ok(Arc::new(NullHandle {
            source: url.to_string(),
        }))
    }
}
