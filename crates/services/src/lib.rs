#![forbid(unsafe_code)]

pub mod audio;
pub mod catalog;
pub mod client;
pub mod error;
pub mod preferences_service;
pub mod report;
pub mod rounds;

pub use quiz_core::Clock;

pub use audio::{AudioHandle, AudioOutput, AudioSequencer, FeedbackCues, NullAudioOutput};
pub use catalog::{CatalogIndex, fetch_catalog, load_catalog_file};
pub use client::{
    GuessVerdict, HttpRoundClient, RemoteRound, RemoteStats, RoundApi, StatsSummary,
};
pub use error::{
    CatalogError, ClientError, EngineError, PlaybackError, PreferencesServiceError, ReportError,
};
pub use preferences_service::PreferencesService;
pub use report::export_history;
pub use rounds::{
    GuessOutcome, GuessRejection, RemoteGuessOutcome, RemoteRoundEngine, Round, RoundEngine,
    RoundPhase,
};
