//! HTTP client for the server-backed round service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::RoundId;

use crate::error::ClientError;

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

/// A round minted by the server. The answer stays server-side; only the
/// audio source and the option labels cross the wire.
///
/// Field names follow the server's snake_case JSON verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRound {
    pub id: RoundId,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub audio_url: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub option_count: Option<u32>,
}

/// Server verdict on a submitted guess. `correct_label` is only populated on
/// a correct guess; the server withholds the answer while retries remain.
#[derive(Debug, Clone, Deserialize)]
pub struct GuessVerdict {
    pub correct: bool,
    #[serde(default)]
    pub correct_label: Option<String>,
    pub feedback_audio: String,
    #[serde(default)]
    pub attempt_number: Option<u32>,
}

/// Aggregated statistics payload. Sections are independently optional so a
/// server build missing one still yields the others.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteStats {
    pub summary: Option<StatsSummary>,
    pub graphs: Option<StatsGraphs>,
    pub tones: Option<ToneExtremes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsSummary {
    pub rounds_completed: u64,
    pub total_guesses: u64,
    pub total_correct: Option<u64>,
    pub accuracy: f64,
    pub first_try_success: f64,
    pub average_attempts_per_round: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsGraphs {
    /// Base64-encoded rendered chart, when the server produced one.
    pub accuracy_by_difficulty: Option<String>,
    pub cumulative_accuracy: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToneExtremes {
    pub best: Vec<ToneAccuracy>,
    pub worst: Vec<ToneAccuracy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToneAccuracy {
    pub label: String,
    pub total: u64,
    pub correct: u64,
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    difficulties: &'a [String],
    option_count: u32,
}

#[derive(Debug, Serialize)]
struct GuessRequest<'a> {
    round_id: &'a str,
    choice: &'a str,
}

#[derive(Debug, Serialize)]
struct RoundRef<'a> {
    round_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RoundEnvelope {
    round: RemoteRound,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

//
// ─── API TRAIT ─────────────────────────────────────────────────────────────────
//

/// Round service operations, abstracted so engines can run against a
/// scripted double in tests.
#[async_trait]
pub trait RoundApi: Send + Sync {
    async fn start_round(
        &self,
        difficulties: &[String],
        option_count: u32,
    ) -> Result<RemoteRound, ClientError>;

    async fn next_round(
        &self,
        difficulties: &[String],
        option_count: u32,
    ) -> Result<RemoteRound, ClientError>;

    async fn guess(&self, round: &RoundId, guess: &str) -> Result<GuessVerdict, ClientError>;

    async fn end_round(&self, round: &RoundId) -> Result<(), ClientError>;

    async fn reset_stats(&self) -> Result<(), ClientError>;

    async fn stats(&self) -> Result<RemoteStats, ClientError>;
}

//
// ─── HTTP CLIENT ───────────────────────────────────────────────────────────────
//

/// `RoundApi` over HTTP.
///
/// A non-success response carrying an `{"error": ...}` body surfaces that
/// message verbatim as `ClientError::Server`; anything else becomes a status
/// or decode error.
pub struct HttpRoundClient {
    client: Client,
    base_url: String,
}

impl HttpRoundClient {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Makes a server-relative path (`/audio/...`, `/feedback/...`) absolute
    /// against the base URL. Already-absolute URLs pass through untouched.
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let path = url.strip_prefix('/').unwrap_or(url);
        format!("{}/{path}", self.base_url)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<Resp>(response: reqwest::Response) -> Result<Resp, ClientError>
    where
        Resp: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
                return Err(ClientError::Server(err.error));
            }
            return Err(ClientError::HttpStatus(status));
        }
        serde_json::from_str(&body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl RoundApi for HttpRoundClient {
    async fn start_round(
        &self,
        difficulties: &[String],
        option_count: u32,
    ) -> Result<RemoteRound, ClientError> {
        let envelope: RoundEnvelope = self
            .post(
                "/api/start",
                &StartRequest {
                    difficulties,
                    option_count,
                },
            )
            .await?;
        let mut round = envelope.round;
        round.audio_url = self.resolve_url(&round.audio_url);
        Ok(round)
    }

    async fn next_round(
        &self,
        difficulties: &[String],
        option_count: u32,
    ) -> Result<RemoteRound, ClientError> {
        let envelope: RoundEnvelope = self
            .post(
                "/api/next",
                &StartRequest {
                    difficulties,
                    option_count,
                },
            )
            .await?;
        let mut round = envelope.round;
        round.audio_url = self.resolve_url(&round.audio_url);
        Ok(round)
    }

    async fn guess(&self, round: &RoundId, guess: &str) -> Result<GuessVerdict, ClientError> {
        let mut verdict: GuessVerdict = self
            .post(
                "/api/guess",
                &GuessRequest {
                    round_id: round.as_str(),
                    choice: guess,
                },
            )
            .await?;
        verdict.feedback_audio = self.resolve_url(&verdict.feedback_audio);
        Ok(verdict)
    }

    async fn end_round(&self, round: &RoundId) -> Result<(), ClientError> {
        let _ack: serde_json::Value = self
            .post(
                "/api/end",
                &RoundRef {
                    round_id: round.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn reset_stats(&self) -> Result<(), ClientError> {
        let _ack: serde_json::Value = self.post("/api/reset", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<RemoteStats, ClientError> {
        let response = self.client.get(self.endpoint("/api/stats")).send().await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_envelope_parses_the_server_payload() {
        // Shape emitted by the round service, snake_case throughout.
        let envelope: RoundEnvelope = serde_json::from_str(
            r#"{
                "round": {
                    "id": "r-17",
                    "difficulty": "hard",
                    "audio_url": "/audio/hard/tone-17.mp3",
                    "options": ["C4", "E4", "G4"],
                    "option_count": 3
                }
            }"#,
        )
        .unwrap();
        assert_eq!(envelope.round.id.as_str(), "r-17");
        assert_eq!(envelope.round.difficulty.as_deref(), Some("hard"));
        assert_eq!(envelope.round.audio_url, "/audio/hard/tone-17.mp3");
        assert_eq!(envelope.round.option_count, Some(3));
        assert_eq!(envelope.round.options.len(), 3);
    }

    #[test]
    fn verdict_parses_wrong_and_correct_shapes() {
        // Wrong guess: the server withholds the label while retries remain.
        let wrong: GuessVerdict = serde_json::from_str(
            r#"{
                "correct": false,
                "attempt_number": 2,
                "feedback_audio": "/feedback/wrong.mp3",
                "correct_label": null
            }"#,
        )
        .unwrap();
        assert!(!wrong.correct);
        assert!(wrong.correct_label.is_none());
        assert_eq!(wrong.attempt_number, Some(2));

        let right: GuessVerdict = serde_json::from_str(
            r#"{
                "correct": true,
                "attempt_number": 3,
                "feedback_audio": "/feedback/correct.mp3",
                "correct_label": "E4"
            }"#,
        )
        .unwrap();
        assert!(right.correct);
        assert_eq!(right.correct_label.as_deref(), Some("E4"));
    }

    #[test]
    fn stats_summary_parses_snake_case_counters() {
        let stats: RemoteStats = serde_json::from_str(
            r#"{
                "summary": {
                    "total_guesses": 20,
                    "total_correct": 12,
                    "accuracy": 0.6,
                    "rounds_completed": 12,
                    "first_try_success": 7,
                    "average_attempts_per_round": 1.66
                },
                "tones": {
                    "best": [{"label": "C4", "total": 5, "correct": 5, "accuracy": 1.0}],
                    "worst": []
                }
            }"#,
        )
        .unwrap();

        let summary = stats.summary.unwrap();
        assert_eq!(summary.rounds_completed, 12);
        assert_eq!(summary.total_guesses, 20);
        assert_eq!(summary.total_correct, Some(12));
        assert!(stats.graphs.is_none());
        assert_eq!(stats.tones.unwrap().best[0].label, "C4");
    }

    #[test]
    fn guess_request_encodes_round_id_and_choice() {
        let body = serde_json::to_value(GuessRequest {
            round_id: "r-17",
            choice: "E4",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"round_id": "r-17", "choice": "E4"}));
    }

    #[test]
    fn start_request_encodes_snake_case_fields() {
        let difficulties = vec!["easy".to_string(), "hard".to_string()];
        let body = serde_json::to_value(StartRequest {
            difficulties: &difficulties,
            option_count: 6,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"difficulties": ["easy", "hard"], "option_count": 6})
        );
    }

    #[test]
    fn server_relative_audio_paths_resolve_against_the_base_url() {
        let client = HttpRoundClient::new(Client::new(), "http://localhost:5000");
        assert_eq!(
            client.resolve_url("/audio/hard/tone-17.mp3"),
            "http://localhost:5000/audio/hard/tone-17.mp3"
        );
        assert_eq!(
            client.resolve_url("/feedback/wrong.mp3"),
            "http://localhost:5000/feedback/wrong.mp3"
        );
        assert_eq!(
            client.resolve_url("https://cdn.example.com/a.mp3"),
            "https://cdn.example.com/a.mp3"
        );
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_the_base_url() {
        let client = HttpRoundClient::new(Client::new(), "http://localhost:5000///");
        assert_eq!(client.endpoint("/api/start"), "http://localhost:5000/api/start");
    }
}
