use quiz_core::fixed_now;
use quiz_core::model::{ModeId, StatsEntry};
use storage::{GuessLogRepository as _, PreferencesRepository as _, Storage};

#[tokio::test]
async fn preferences_round_trip_through_sqlite() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();

    assert!(storage.preferences.load_preferences().await.unwrap().is_none());

    storage
        .preferences
        .save_preferences(r#"{"volume":0.25,"listeningMode":true}"#)
        .await
        .unwrap();
    storage
        .preferences
        .save_preferences(r#"{"volume":0.75,"listeningMode":true}"#)
        .await
        .unwrap();

    let stored = storage.preferences.load_preferences().await.unwrap().unwrap();
    assert_eq!(stored, r#"{"volume":0.75,"listeningMode":true}"#);
}

#[tokio::test]
async fn guess_log_appends_and_lists_in_order() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
    let mode = ModeId::new("birds");

    let guesses = [("robin", true), ("sparrow", false), ("robin", true)];
    for (guess, correct) in guesses {
        let entry = StatsEntry {
            timestamp: fixed_now(),
            mode: mode.clone(),
            correct_answer: "robin".into(),
            guess: guess.into(),
            correct,
        };
        let id = storage.guesses.append_guess(&entry).await.unwrap();
        assert!(id > 0);
    }

    let listed = storage.guesses.list_guesses().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].guess, "robin");
    assert_eq!(listed[1].guess, "sparrow");
    assert!(!listed[1].correct);
    assert_eq!(listed[2].timestamp, fixed_now());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
    drop(storage);

    // A second connect + migrate against a fresh in-memory database must not fail.
    let again = Storage::sqlite("sqlite::memory:").await.unwrap();
    assert!(again.preferences.load_preferences().await.unwrap().is_none());
}
