//! Export of the session guess history to a dated JSON report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use quiz_core::model::SessionStats;

use crate::error::ReportError;

/// Writes the full guess history, most recent entry included, as pretty
/// JSON to `quiz-report-YYYY-MM-DD.json` in `dir`.
///
/// # Errors
///
/// Returns `ReportError` on serialization or filesystem failure.
pub fn export_history(
    stats: &SessionStats,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ReportError> {
    let snapshot = stats.export_snapshot();
    let payload = serde_json::to_string_pretty(&snapshot)?;
    let path = dir.join(format!("quiz-report-{}.json", now.format("%Y-%m-%d")));
    std::fs::write(&path, payload)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::fixed_now;
    use quiz_core::model::{ModeId, StatsEntry};

    #[test]
    fn report_contains_the_latest_entry() {
        let mut stats = SessionStats::new();
        stats.record(fixed_now(), ModeId::new("birds"), "robin", "robin", true);
        stats.record(fixed_now(), ModeId::new("birds"), "wren", "crow", false);

        let dir = std::env::temp_dir();
        let path = export_history(&stats, &dir, fixed_now()).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<StatsEntry> = serde_json::from_str(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].guess, "crow");
        assert!(!entries[1].correct);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn report_filename_carries_the_date() {
        let stats = SessionStats::new();
        let dir = std::env::temp_dir();
        let path = export_history(&stats, &dir, fixed_now()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("quiz-report-"));
        assert!(name.ends_with(".json"));

        std::fs::remove_file(path).ok();
    }
}
