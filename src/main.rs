use chrono::{DateTime, Days, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;

use cli::Cli;
use cli::commands::{CardCommands, Commands, DeckCommands};
use reviewr::config::{GlobalConfig, StorageBackend, load_config};
use reviewr::domain::{Card, Deck};
use reviewr::engine::{RatingPreview, humanize_due};
use reviewr::review::{ReviewOrchestrator, ReviewSession, UndoHistory};
use reviewr::scheduler::{ScheduledCard, Scope, study_day};
use reviewr::storage::{JsonlStorage, SqliteStorage, Storage};

/// Undo histories of local users, kept between invocations.
const HISTORY_FILE: &str = "history.json";

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reviewr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("reviewr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn local_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".to_string())
}

fn load_histories(path: &Path) -> Result<HashMap<String, UndoHistory>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = fs::read_to_string(path).context("Failed to read undo history")?;
    serde_json::from_str(&content).context("Failed to parse undo history")
}

fn save_histories(path: &Path, histories: &HashMap<String, UndoHistory>) -> Result<()> {
    let content = serde_json::to_string_pretty(histories)?;
    fs::write(path, content).context("Failed to write undo history")
}

/// Run a study command with the local user's saved undo history.
fn with_session<S: Storage, T>(
    orchestrator: &ReviewOrchestrator<S>,
    data_dir: &Path,
    scope: Scope,
    f: impl FnOnce(&mut ReviewSession<'_, S>) -> reviewr::Result<T>,
) -> Result<T> {
    let path = data_dir.join(HISTORY_FILE);
    let mut histories = load_histories(&path)?;
    let user = local_user();
    let history = histories.remove(&user).unwrap_or_default();

    let mut session = ReviewSession::resume(orchestrator, &user, scope, history);
    let result = f(&mut session);
    histories.insert(user, session.into_history());
    save_histories(&path, &histories)?;
    Ok(result?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_due(now: DateTime<Utc>, due_at: Option<DateTime<Utc>>) -> String {
    match due_at {
        Some(due) => format!("{} ({})", due.format("%Y-%m-%d %H:%M"), humanize_due(now, Some(due))),
        None => "-".to_string(),
    }
}

fn print_card(scheduled: &ScheduledCard, now: DateTime<Utc>) {
    let card = &scheduled.card;
    let state = &scheduled.state;
    println!("{} {}", "Card:".green(), card.id.bold());
    println!("  deck:     {}", card.deck_id);
    if !card.tags.is_empty() {
        println!("  tags:     {}", card.tags.join(", "));
    }
    println!("  queue:    {}", state.queue_status);
    println!("  due:      {}", format_due(now, state.due_at));
    println!(
        "  interval: {}d  ease: {:.2}  reps: {}  lapses: {}",
        state.interval_days, state.ease, state.reps, state.lapses
    );
}

fn print_previews(previews: &[RatingPreview]) {
    for preview in previews {
        println!("  [{}] {:<6} {}", preview.rating.value(), preview.label, preview.humanized.cyan());
    }
}

fn run_application<S: Storage>(cli: &Cli, orchestrator: &ReviewOrchestrator<S>, data_dir: &Path) -> Result<()> {
    let now = Utc::now();
    info!("Running command: {:?}", cli.command);

    match &cli.command {
        Commands::Deck { command } => handle_deck_command(cli, command, orchestrator, now),
        Commands::Card { command } => handle_card_command(cli, command, orchestrator, now),
        Commands::Next { scope, ahead } => {
            let scope = scope.scope();
            let next = if *ahead {
                orchestrator.next_card_ahead(&scope, now)?
            } else {
                orchestrator.next_card(&scope, now)?
            };
            let Some(next) = next else {
                if cli.json {
                    return print_json(&Option::<ScheduledCard>::None);
                }
                println!("{}", "Nothing due. Congratulations!".green());
                return Ok(());
            };
            let previews = orchestrator.preview_all_ratings(&next.card.id, now)?;
            if cli.json {
                return print_json(&serde_json::json!({ "card": next, "previews": previews }));
            }
            print_card(&next, now);
            print_previews(&previews);
            Ok(())
        }
        Commands::Preview { card_id } => {
            let previews = orchestrator.preview_all_ratings(card_id, now)?;
            if cli.json {
                return print_json(&previews);
            }
            print_previews(&previews);
            Ok(())
        }
        Commands::Grade { card_id, rating, scope } => {
            let (result, _) = with_session(orchestrator, data_dir, scope.scope(), |session| {
                session.grade(card_id, *rating, now)
            })?;
            if cli.json {
                return print_json(&result);
            }
            println!(
                "{} {} as {}: {} -> {}, next {}",
                "Graded".green(),
                card_id,
                rating.label().bold(),
                result.interval_before,
                result.interval_after,
                humanize_due(now, result.state_after.due_at)
            );
            if result.became_leech {
                println!("{}", "Card is now tagged as a leech".red());
            }
            Ok(())
        }
        Commands::Undo { scope } => {
            let outcome = with_session(orchestrator, data_dir, scope.scope(), |session| session.undo())?;
            if cli.json {
                return print_json(&outcome);
            }
            match outcome {
                Some(outcome) => println!("{} {} on {}", "Undid".yellow(), outcome.rating, outcome.card.id),
                None => println!("{}", "Nothing to undo".yellow()),
            }
            Ok(())
        }
        Commands::Defer { card_id, days } => {
            let state = orchestrator.defer(card_id, *days, now)?;
            if cli.json {
                return print_json(&state);
            }
            println!("{} {} until {}", "Deferred".yellow(), card_id, format_due(now, state.due_at));
            Ok(())
        }
        Commands::Summary { scope } => {
            let summary = orchestrator.today_summary(&scope.scope(), now)?;
            if cli.json {
                return print_json(&summary);
            }
            println!("{} {}", "New:".blue(), summary.new_count);
            println!("{} {}", "Review:".green(), summary.review_count);
            println!("{} {}", "Due:".yellow(), summary.due_count);
            Ok(())
        }
        Commands::Activity { days } => {
            let from = study_day(now, orchestrator.config().day_cutoff_hour);
            let to = from
                .checked_add_days(Days::new(u64::from(days.saturating_sub(1))))
                .ok_or_else(|| eyre::eyre!("Activity range of {} days is out of range", days))?;
            let activity = orchestrator.daily_activity(from, to, now)?;
            if cli.json {
                return print_json(&activity);
            }
            for day in activity {
                println!("{}  reviews: {:>4}  due: {:>4}", day.day, day.reviews, day.due);
            }
            Ok(())
        }
    }
}

fn handle_deck_command<S: Storage>(
    cli: &Cli,
    command: &DeckCommands,
    orchestrator: &ReviewOrchestrator<S>,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        DeckCommands::Add { name, parent } => {
            let mut deck = Deck::new(name, now);
            if let Some(parent) = parent {
                deck = deck.with_parent(parent);
            }
            orchestrator.add_deck(&deck)?;
            if cli.json {
                return print_json(&deck);
            }
            println!("{} {} {}", "Added deck".green(), deck.name.bold(), deck.id);
        }
        DeckCommands::List => {
            let decks = orchestrator.list_decks()?;
            if cli.json {
                return print_json(&decks);
            }
            let mut rows: Vec<(String, &str)> = decks.iter().map(|d| (d.full_path(&decks), d.id.as_str())).collect();
            rows.sort();
            for (path, id) in rows {
                println!("{:<40} {}", path, id.dimmed());
            }
        }
    }
    Ok(())
}

fn handle_card_command<S: Storage>(
    cli: &Cli,
    command: &CardCommands,
    orchestrator: &ReviewOrchestrator<S>,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        CardCommands::Add { deck, tags, sibling } => {
            let mut card = Card::new(deck, now).with_tags(tags);
            if let Some(sibling) = sibling {
                card = card.with_sibling_key(sibling);
            }
            orchestrator.add_card(&card)?;
            if cli.json {
                return print_json(&card);
            }
            println!("{} {}", "Added card".green(), card.id.bold());
        }
        CardCommands::List { scope } => {
            let cards = orchestrator.scheduled_cards(&scope.scope())?;
            if cli.json {
                return print_json(&cards);
            }
            for scheduled in &cards {
                println!(
                    "{:<24} {:<8} {:<28} {}",
                    scheduled.card.id,
                    scheduled.state.queue_status.as_str(),
                    format_due(now, scheduled.state.due_at),
                    scheduled.card.tags.join(",")
                );
            }
        }
        CardCommands::Delete { card_id } => {
            orchestrator.delete_card(card_id)?;
            if !cli.json {
                println!("{} {}", "Deleted card".red(), card_id);
            }
        }
    }
    Ok(())
}

fn run_with_backend(cli: &Cli, config: &GlobalConfig) -> Result<()> {
    let data_dir = &config.storage.data_dir;
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    info!("Using {:?} storage in {}", config.storage.backend, data_dir.display());

    match config.storage.backend {
        StorageBackend::Jsonl => {
            let storage = JsonlStorage::new(data_dir)?;
            let orchestrator = ReviewOrchestrator::new(storage, config.scheduler.clone())?;
            run_application(cli, &orchestrator, data_dir)
        }
        StorageBackend::Sqlite => {
            let storage = SqliteStorage::open(data_dir)?;
            let orchestrator = ReviewOrchestrator::new(storage, config.scheduler.clone())?;
            run_application(cli, &orchestrator, data_dir)
        }
    }
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    if cli.is_verbose() {
        println!("{} {}", "Data directory:".yellow(), config.storage.data_dir.display());
    }

    // Run the main application logic
    run_with_backend(&cli, &config).context("Application failed")?;

    Ok(())
}
