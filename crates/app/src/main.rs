use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;

use quiz_core::model::{AnswerOption, Mode, ModeId, Preferences};
use services::{
    AudioOutput, AudioSequencer, CatalogIndex, FeedbackCues, GuessOutcome, HttpRoundClient,
    NullAudioOutput, PreferencesService, RemoteGuessOutcome, RemoteRoundEngine, RoundEngine,
    export_history, fetch_catalog, load_catalog_file,
};
use storage::repository::{GuessLogRepository as _, Storage};
use tracing_subscriber::EnvFilter;

mod audio_out;

use audio_out::RodioAudioOutput;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => {
                write!(f, "invalid {flag} value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- local  [--db <sqlite_url>] [--catalog <path_or_url>]");
    eprintln!("                             [--modes a,b,c] [--slots <n>] [--listen]");
    eprintln!("                             [--volume <0..1>] [--rate <x>] [--no-audio]");
    eprintln!("  cargo run -p app -- remote --server <url> [--difficulties a,b]");
    eprintln!("                             [--options <n>] [--db <sqlite_url>] [--no-audio]");
    eprintln!("  cargo run -p app -- export [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --catalog catalog.json");
    eprintln!("  --slots 4");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATALOG, QUIZ_SERVER");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Local,
    Remote,
    Export,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            "export" => Some(Self::Export),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    catalog: String,
    server: Option<String>,
    modes: Vec<String>,
    slots: usize,
    listen: bool,
    volume: Option<f64>,
    rate: Option<f64>,
    no_audio: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url),
            catalog: std::env::var("QUIZ_CATALOG")
                .ok()
                .unwrap_or_else(|| "catalog.json".into()),
            server: std::env::var("QUIZ_SERVER").ok(),
            modes: Vec::new(),
            slots: 4,
            listen: false,
            volume: None,
            rate: None,
            no_audio: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--catalog" => parsed.catalog = require_value(args, "--catalog")?,
                "--server" => parsed.server = Some(require_value(args, "--server")?),
                "--modes" | "--difficulties" => {
                    let value = require_value(args, "--modes")?;
                    parsed.modes = value
                        .split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(String::from)
                        .collect();
                }
                "--slots" | "--options" => {
                    let value = require_value(args, "--slots")?;
                    parsed.slots = value.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--slots",
                        raw: value.clone(),
                    })?;
                }
                "--volume" => {
                    let value = require_value(args, "--volume")?;
                    parsed.volume = Some(value.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--volume",
                        raw: value.clone(),
                    })?);
                }
                "--rate" => {
                    let value = require_value(args, "--rate")?;
                    parsed.rate = Some(value.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--rate",
                        raw: value.clone(),
                    })?);
                }
                "--listen" => parsed.listen = true,
                "--no-audio" => parsed.no_audio = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn open_audio(no_audio: bool) -> Arc<dyn AudioOutput> {
    if no_audio {
        return Arc::new(NullAudioOutput);
    }
    match RodioAudioOutput::new() {
        Ok(output) => Arc::new(output),
        Err(err) => {
            tracing::warn!(error = %err, "no audio device, playback disabled");
            Arc::new(NullAudioOutput)
        }
    }
}

fn sequencer(no_audio: bool) -> AudioSequencer {
    AudioSequencer::new(
        open_audio(no_audio),
        FeedbackCues {
            correct: "assets/correct.mp3".into(),
            wrong: "assets/wrong.mp3".into(),
        },
    )
}

fn prompt(text: &str) -> Option<String> {
    print!("{text}");
    std::io::stdout().flush().ok()?;
    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line).ok()?;
    if read == 0 {
        return None;
    }
    Some(line.trim().to_string())
}

async fn load_modes(spec: &str) -> Result<Vec<Mode>, Box<dyn std::error::Error>> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        let client = reqwest::Client::new();
        Ok(fetch_catalog(&client, spec).await?)
    } else {
        Ok(load_catalog_file(std::path::Path::new(spec))?)
    }
}

/// Default slot layout drawn from the selected modes' own answers, used when
/// an item carries fewer options than there are slots.
fn fallback_layout(catalog: &CatalogIndex, selected: &[ModeId], slots: usize) -> Vec<AnswerOption> {
    let mut layout: Vec<AnswerOption> = Vec::with_capacity(slots);
    for mode in catalog.modes() {
        if !selected.contains(mode.id()) {
            continue;
        }
        for item in mode.items() {
            let Some(id) = item.answer_id() else {
                continue;
            };
            if layout.iter().any(|option| option.id == id) {
                continue;
            }
            layout.push(AnswerOption::new(id.clone(), id));
            if layout.len() == slots {
                return layout;
            }
        }
    }
    layout
}

fn apply_overrides(mut preferences: Preferences, args: &Args) -> Preferences {
    if let Some(volume) = args.volume {
        preferences.volume = volume;
    }
    if let Some(rate) = args.rate {
        preferences.rate = rate;
    }
    if args.listen {
        preferences.listening_mode = true;
    }
    if !args.modes.is_empty() {
        preferences.modes = args.modes.iter().map(ModeId::new).collect();
    }
    preferences.sanitized()
}

async fn run_local(args: Args, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let prefs_service = PreferencesService::new(Arc::clone(&storage.preferences));
    let preferences = apply_overrides(prefs_service.load().await?, &args);

    let modes = match load_modes(&args.catalog).await {
        Ok(modes) => modes,
        Err(err) => {
            eprintln!("catalog unavailable: {err}");
            Vec::new()
        }
    };
    let catalog = CatalogIndex::new(modes);

    let selected: Vec<ModeId> = if preferences.modes.is_empty() {
        catalog.mode_ids()
    } else {
        preferences.modes.iter().cloned().collect()
    };
    let fallback = fallback_layout(&catalog, &selected, args.slots);

    let mut engine = RoundEngine::new(catalog, sequencer(args.no_audio), preferences, fallback);
    engine.start(selected, args.slots)?;

    println!("commands: play, a <answer>, next, skip, stats, export, quit");
    loop {
        let Some(line) = prompt("> ") else { break };
        let (cmd, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match cmd {
            "" => {}
            "play" | "p" => {
                if let Err(err) = engine.play().await {
                    eprintln!("{err}");
                }
            }
            "a" | "answer" => match engine.answer(rest) {
                Ok(GuessOutcome::Evaluated {
                    correct,
                    correct_answer,
                    streak,
                }) => {
                    if correct {
                        println!("correct! streak {streak}");
                    } else {
                        println!("wrong, it was {correct_answer}");
                    }
                    if let Some(entry) = engine.stats().history().last() {
                        if let Err(err) = storage.guesses.append_guess(entry).await {
                            tracing::warn!(error = %err, "failed to persist guess");
                        }
                    }
                }
                Ok(GuessOutcome::Rejected(reason)) => println!("guess ignored: {reason:?}"),
                Err(err) => eprintln!("{err}"),
            },
            "next" | "n" => {
                if let Err(err) = engine.next() {
                    eprintln!("{err}");
                }
            }
            "skip" | "s" => {
                if let Err(err) = engine.skip() {
                    eprintln!("{err}");
                }
            }
            "stats" => {
                let stats = engine.stats();
                println!(
                    "correct {} wrong {} streak {}",
                    stats.correct(),
                    stats.wrong(),
                    stats.streak()
                );
            }
            "export" => match export_history(
                engine.stats(),
                std::path::Path::new("."),
                quiz_core::Clock::default().now(),
            ) {
                Ok(path) => println!("wrote {}", path.display()),
                Err(err) => eprintln!("{err}"),
            },
            "quit" | "q" | "end" => break,
            other => println!("unknown command: {other}"),
        }
    }

    engine.end();
    if let Err(err) = prefs_service.save(engine.preferences()).await {
        tracing::warn!(error = %err, "failed to persist preferences");
    }
    Ok(())
}

/// Writes the entire persisted guess log as a dated report.
async fn run_export(storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let entries = storage.guesses.list_guesses().await?;
    let mut stats = quiz_core::model::SessionStats::new();
    for entry in entries {
        stats.record(
            entry.timestamp,
            entry.mode,
            entry.correct_answer,
            entry.guess,
            entry.correct,
        );
    }

    let path = export_history(
        &stats,
        std::path::Path::new("."),
        quiz_core::Clock::default().now(),
    )?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn run_remote(args: Args, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let Some(server) = args.server.clone() else {
        eprintln!("remote requires --server <url>");
        print_usage();
        return Err(ArgsError::MissingValue { flag: "--server" }.into());
    };

    let prefs_service = PreferencesService::new(Arc::clone(&storage.preferences));
    let preferences = apply_overrides(prefs_service.load().await?, &args);

    let api = Arc::new(HttpRoundClient::new(reqwest::Client::new(), server));
    let mut engine = RemoteRoundEngine::new(api, sequencer(args.no_audio), preferences.clone());

    let difficulties = if args.modes.is_empty() {
        vec!["normal".to_string()]
    } else {
        args.modes.clone()
    };
    let slots = u32::try_from(args.slots).unwrap_or(4);
    engine.start(difficulties, slots).await?;

    println!("commands: play, g <answer>, stats, reset, quit");
    loop {
        let Some(line) = prompt("> ") else { break };
        let (cmd, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match cmd {
            "" => {}
            "play" | "p" => {
                if let Err(err) = engine.play().await {
                    eprintln!("{err}");
                }
            }
            "g" | "guess" => match engine.guess(rest).await {
                Ok(RemoteGuessOutcome::Evaluated {
                    correct,
                    correct_label,
                    attempt_number,
                    streak,
                }) => {
                    if correct {
                        println!("correct! streak {streak}");
                    } else if let Some(label) = correct_label {
                        println!(
                            "wrong (attempt {}), it was {label}",
                            attempt_number.unwrap_or(1)
                        );
                    } else {
                        println!("wrong (attempt {})", attempt_number.unwrap_or(1));
                    }
                    if let Some(entry) = engine.stats().history().last() {
                        if let Err(err) = storage.guesses.append_guess(entry).await {
                            tracing::warn!(error = %err, "failed to persist guess");
                        }
                    }
                }
                Ok(RemoteGuessOutcome::Rejected(reason)) => {
                    println!("guess ignored: {reason:?}");
                }
                Err(err) => eprintln!("{err}"),
            },
            "stats" => match engine.fetch_stats().await {
                Ok(stats) => {
                    if let Some(summary) = stats.summary {
                        println!(
                            "rounds {} guesses {} accuracy {:.1}%",
                            summary.rounds_completed,
                            summary.total_guesses,
                            summary.accuracy * 100.0
                        );
                    } else {
                        println!("no summary available");
                    }
                    if let Some(tones) = stats.tones {
                        for tone in tones.best.iter().take(3) {
                            println!("  best  {} {:.1}%", tone.label, tone.accuracy * 100.0);
                        }
                        for tone in tones.worst.iter().take(3) {
                            println!("  worst {} {:.1}%", tone.label, tone.accuracy * 100.0);
                        }
                    }
                }
                Err(err) => eprintln!("{err}"),
            },
            "reset" => {
                if let Err(err) = engine.reset_stats().await {
                    eprintln!("{err}");
                }
            }
            "quit" | "q" | "end" => break,
            other => println!("unknown command: {other}"),
        }
    }

    engine.end().await;
    if let Err(err) = prefs_service.save(&preferences).await {
        tracing::warn!(error = %err, "failed to persist preferences");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Local,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Local,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;

    match cmd {
        Command::Local => run_local(args, storage).await,
        Command::Remote => run_remote(args, storage).await,
        Command::Export => run_export(storage).await,
    }
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
