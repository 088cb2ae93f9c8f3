//! Round lifecycle engines: local catalog-driven and server-backed.

mod engine;
mod remote;

pub use engine::{GuessOutcome, GuessRejection, Round, RoundEngine, RoundPhase};
pub use remote::{RemoteGuessOutcome, RemoteRoundEngine};
