//! lessontrack CLI - inspect and replay lesson watch progress.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use lessontrack_core::{Lesson, PlayerEvent, ProgressRecord, SessionId, UserId};
use lessontrack_storage::{JsonStorage, ProgressStore};
use lessontrack_progress::{
    ChannelNotifier, CompletionValidator, LessonSession, ReplayPlayer, StoredProgressValidator,
    TrackerConfig,
};

#[derive(Parser)]
#[command(name = "lessontrack")]
#[command(about = "Lesson watch-progress tracker", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(long, default_value = ".lessontrack")]
    data_dir: PathBuf,

    /// Tracker config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded player event log (one JSON event per line)
    Replay {
        /// Learner ID
        #[arg(long)]
        user: String,
        /// Lesson ID
        #[arg(long)]
        session: String,
        /// Authored lesson length in minutes (initial estimate)
        #[arg(long)]
        minutes: Option<f64>,
        /// Real video duration the player reports on `ready`
        #[arg(long)]
        duration: Option<f64>,
        /// Event log
        events: PathBuf,
    },
    /// Show stored progress
    Show {
        /// Learner ID
        #[arg(long)]
        user: String,
        /// Lesson ID (all lessons if omitted)
        #[arg(long)]
        session: Option<String>,
    },
    /// Validate completion against stored progress
    Complete {
        /// Learner ID
        #[arg(long)]
        user: String,
        /// Lesson ID
        #[arg(long)]
        session: String,
        /// Duration reported by the client
        #[arg(long)]
        duration: f64,
        /// Catalog lesson length in minutes
        #[arg(long)]
        minutes: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let storage = Arc::new(JsonStorage::new(&cli.data_dir).await?);
    let store: Arc<dyn ProgressStore> = storage.clone();

    match cli.command {
        Commands::Replay { user, session, minutes, duration, events } => {
            let user = parse_user(&user)?;
            let mut lesson = Lesson::new(parse_session(&session)?, "replay");
            if let Some(m) = minutes {
                lesson = lesson.with_duration_minutes(m);
            }
            replay(store, config, user, lesson, duration.unwrap_or(0.0), &events).await?;
        }
        Commands::Show { user, session } => {
            let user = parse_user(&user)?;
            let records: Vec<ProgressRecord> = match session {
                Some(s) => store
                    .load_progress(user, parse_session(&s)?)
                    .await?
                    .into_iter()
                    .collect(),
                None => store.list_progress(user).await?,
            };

            println!("Progress ({})", records.len());
            for record in &records {
                let completed = store.load_completion(user, record.session_id).await?.is_some();
                let version = storage.progress_version(user, record.session_id).await?;
                print_record(record, version, completed);
            }
        }
        Commands::Complete { user, session, duration, minutes } => {
            let user = parse_user(&user)?;
            let session = parse_session(&session)?;

            let mut validator = StoredProgressValidator::from_config(store, &config);
            if let Some(m) = minutes {
                validator = validator.with_lesson(&Lesson::new(session, "lesson").with_duration_minutes(m));
            }

            let outcome = validator.validate_completion(user, session, duration).await?;
            if outcome.is_valid {
                println!("COMPLETED: {}% watched", outcome.watched_percentage);
            } else {
                println!(
                    "REJECTED: {}% watched, {}% required",
                    outcome.watched_percentage, outcome.required_percentage
                );
            }
        }
    }

    Ok(())
}

async fn replay(
    store: Arc<dyn ProgressStore>,
    config: TrackerConfig,
    user: UserId,
    lesson: Lesson,
    duration: f64,
    events: &Path,
) -> Result<()> {
    let log = tokio::fs::read_to_string(events)
        .await
        .with_context(|| format!("Failed to read {}", events.display()))?;

    let player = Arc::new(ReplayPlayer::new(duration));
    let (notifier, mut notices) = ChannelNotifier::new();
    let session = LessonSession::open(lesson, user, store, Arc::new(notifier), player.clone(), config).await;

    let mut count = 0usize;
    for (idx, line) in log.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: PlayerEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", events.display(), idx + 1))?;
        player.observe(&event);
        session.handle_event(event).await;
        count += 1;
    }

    let data = session.close().await;
    info!("Replayed {} events", count);

    while let Ok(notice) = notices.try_recv() {
        println!("notice: {}", notice.message());
    }

    println!("Lesson: {}", data.session_id);
    println!("  Duration: {:.1}s", data.video_duration);
    println!("  Watched: {:.1}s ({}%)", data.total_watched_seconds, data.watched_percentage);
    for range in data.watched_ranges.iter() {
        println!("    [{:.1}, {:.1}]", range.start, range.end);
    }
    Ok(())
}

fn print_record(record: &ProgressRecord, version: u64, completed: bool) {
    let duration = record.video_duration;
    println!(
        "  {} | v{} | {}s watched | {}% | {} ranges | {}{}",
        record.session_id,
        version,
        record.total_watched_seconds,
        record.watched_percentage(duration),
        record.watched_ranges.len(),
        record.updated_at.format("%Y-%m-%d %H:%M:%S"),
        if completed { " | COMPLETED" } else { "" },
    );
}

fn parse_user(s: &str) -> Result<UserId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid user ID: {}", s))
}

fn parse_session(s: &str) -> Result<SessionId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid lesson ID: {}", s))
}
