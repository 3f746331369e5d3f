//! tracker - habit tracker CLI
//!
//! Create trackers, mark them done per day and look at completion statistics.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracker_core::query::{fold, EventLog, QueryEvent};
use tracker_core::{
    Color, CompletionFilter, Config, Database, EngineSettings, NewTracker, RecordStore, Tracker,
    TrackerQueryEngine, TrackerUpdate, Weekday, WeekdayMask,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tracker")]
#[command(about = "Habit tracker - track recurring habits by weekday")]
#[command(version)]
struct Args {
    /// Database file (default: from config, else ~/.local/share/tracker/tracker.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Day to act on, YYYY-MM-DD (default: today)
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// Print view change events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a tracker
    Add {
        name: String,

        /// Category title, created if missing (default: the uncategorized category)
        #[arg(short, long)]
        category: Option<String>,

        #[arg(long, default_value = "✅")]
        emoji: String,

        /// Hex color, e.g. #FD4C49
        #[arg(long, default_value = "#FD4C49")]
        color: Color,

        /// Comma separated weekdays, e.g. mon,fri (default: every day)
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
    },

    /// Show trackers scheduled on the selected day, grouped by category
    List {
        /// Show every tracker regardless of schedule
        #[arg(long)]
        all: bool,

        /// Only trackers whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// all, completed or uncompleted (relative to the selected day)
        #[arg(short, long, default_value = "all")]
        filter: CompletionFilter,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle completion of a tracker on the selected day
    Done {
        /// Tracker id, id prefix or name
        tracker: String,
    },

    /// Rename a tracker
    Rename { tracker: String, name: String },

    /// Change fields of a tracker
    Edit {
        tracker: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        emoji: Option<String>,

        #[arg(long)]
        color: Option<Color>,

        #[arg(long)]
        category: Option<String>,

        /// Comma separated weekdays; `--days` without a value clears the schedule
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        days: Option<Vec<Weekday>>,
    },

    /// Delete a tracker and its completion history
    Delete { tracker: String },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Show completion statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    /// List categories with their tracker counts
    List,
    /// Create an empty category
    Add { title: String },
    /// Rename a category, keeping its trackers
    Rename { old: String, new: String },
    /// Delete a category, moving its trackers to the uncategorized category
    Delete { title: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = tracker_core::logging::init(&config.logging).ok();

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.migrate().context("failed to run migrations")?;

    let mut engine = TrackerQueryEngine::new(db, EngineSettings::from(&config))
        .context("failed to load trackers")?;

    let events = EventLog::new();
    if args.verbose {
        eprintln!("Database: {}", db_path.display());
        eprintln!("Logs:     {}", tracker_core::logging::log_file_path().display());
        engine.subscribe(events.clone());
    }

    let day = args.date.unwrap_or_else(|| Local::now().date_naive());
    tracing::debug!(command = ?args.command, %day, "Running command");
    run(&mut engine, day, args.command)?;

    if args.verbose {
        print_events(&events.take());
    }

    Ok(())
}

fn run(engine: &mut TrackerQueryEngine<Database>, day: NaiveDate, command: Command) -> Result<()> {
    match command {
        Command::Add {
            name,
            category,
            emoji,
            color,
            days,
        } => {
            let schedule = if days.is_empty() {
                WeekdayMask::EVERY_DAY
            } else {
                days.into_iter().collect()
            };
            let category =
                category.unwrap_or_else(|| engine.settings().uncategorized_title.clone());
            let tracker = engine
                .add_tracker(NewTracker {
                    name,
                    emoji,
                    color,
                    category,
                    schedule,
                })
                .context("failed to add tracker")?;
            println!(
                "Added {} {} [{}] ({})",
                tracker.emoji,
                tracker.name,
                short_id(tracker.id),
                tracker.schedule
            );
        }

        Command::List {
            all,
            search,
            filter,
            json,
        } => {
            engine.select_day(day)?;
            if all {
                engine.set_weekday_filter(None)?;
            }
            engine.set_search_text(search.as_deref())?;
            engine.set_completion_filter(filter)?;

            if json {
                print_list_json(engine, day)?;
            } else {
                print_list(engine, day, all)?;
            }
        }

        Command::Done { tracker } => {
            let tracker = resolve_tracker(engine, &tracker)?;
            let completed = engine
                .toggle_completion(tracker.id, day)
                .with_context(|| format!("failed to toggle {}", tracker.name))?;
            let state = if completed { "done" } else { "not done" };
            println!("{} {} marked {} on {}", tracker.emoji, tracker.name, state, day);
        }

        Command::Rename { tracker, name } => {
            let tracker = resolve_tracker(engine, &tracker)?;
            let renamed = engine.rename_tracker(tracker.id, &name)?;
            println!("Renamed {} to {}", tracker.name, renamed.name);
        }

        Command::Edit {
            tracker,
            name,
            emoji,
            color,
            category,
            days,
        } => {
            let tracker = resolve_tracker(engine, &tracker)?;
            let update = TrackerUpdate {
                name,
                emoji,
                color,
                schedule: days.map(|d| d.into_iter().collect()),
                category,
            };
            if update.is_empty() {
                anyhow::bail!(
                    "nothing to change; pass at least one of \
                     --name, --emoji, --color, --category, --days"
                );
            }
            let updated = engine.update_tracker(tracker.id, update)?;
            println!(
                "Updated {} {} [{}] in {} ({})",
                updated.emoji,
                updated.name,
                short_id(updated.id),
                updated.category,
                updated.schedule
            );
        }

        Command::Delete { tracker } => {
            let tracker = resolve_tracker(engine, &tracker)?;
            let removed = engine.delete_tracker(tracker.id)?;
            println!(
                "Deleted {} ({} completion record{})",
                tracker.name,
                removed,
                if removed == 1 { "" } else { "s" }
            );
        }

        Command::Categories { action } => run_categories(engine, action)?,

        Command::Stats { json } => {
            let stats = engine.statistics()?;
            let current = engine.current_streak()?;
            if json {
                let mut value = serde_json::to_value(stats)?;
                value["current_streak"] = serde_json::json!(current);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if stats.is_empty() {
                println!("No completions yet.");
            } else {
                println!("Best streak:     {}", stats.best_streak);
                println!("Current streak:  {}", current);
                println!("Ideal days:      {}", stats.ideal_days);
                println!("Completed:       {}", stats.completed_total);
                println!("Average per day: {}", stats.average_per_day);
            }
        }
    }

    Ok(())
}

fn run_categories(engine: &mut TrackerQueryEngine<Database>, action: CategoryAction) -> Result<()> {
    match action {
        CategoryAction::List => {
            let categories = engine.categories()?;
            if categories.is_empty() {
                println!("No categories.");
            }
            for category in categories {
                println!("{:<24} {}", category.title, category.tracker_count);
            }
        }
        CategoryAction::Add { title } => {
            if engine.add_category(&title)? {
                println!("Added category {}", title.trim());
            } else {
                println!("Category {} already exists", title.trim());
            }
        }
        CategoryAction::Rename { old, new } => {
            engine.rename_category(&old, &new)?;
            println!("Renamed category {} to {}", old.trim(), new.trim());
        }
        CategoryAction::Delete { title } => {
            let moved = engine.delete_category(&title)?;
            println!(
                "Deleted category {} ({} tracker{} moved to {})",
                title.trim(),
                moved,
                if moved == 1 { "" } else { "s" },
                engine.settings().uncategorized_title
            );
        }
    }
    Ok(())
}

/// Find a tracker by full id, unique id prefix or name (case-insensitive).
fn resolve_tracker(engine: &TrackerQueryEngine<Database>, key: &str) -> Result<Tracker> {
    let trackers = engine.store().list_trackers()?;

    if let Ok(id) = Uuid::parse_str(key) {
        return trackers
            .into_iter()
            .find(|t| t.id == id)
            .with_context(|| format!("no tracker with id {}", id));
    }

    let folded = fold(key.trim());
    let by_name: Vec<&Tracker> = trackers.iter().filter(|t| fold(&t.name) == folded).collect();
    let candidates = if by_name.is_empty() {
        let prefix = key.trim().to_lowercase();
        trackers
            .iter()
            .filter(|t| !prefix.is_empty() && t.id.to_string().starts_with(&prefix))
            .collect()
    } else {
        by_name
    };

    match candidates.as_slice() {
        [tracker] => Ok((*tracker).clone()),
        [] => anyhow::bail!("no tracker matches '{}'", key),
        many => {
            let ids: Vec<String> = many.iter().map(|t| short_id(t.id)).collect();
            anyhow::bail!("'{}' is ambiguous, matches {}", key, ids.join(", "))
        }
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn print_list(engine: &TrackerQueryEngine<Database>, day: NaiveDate, all: bool) -> Result<()> {
    if all {
        println!("All trackers");
    } else {
        println!("{} ({})", day, Weekday::of(day));
    }

    if engine.is_empty() {
        println!("  Nothing scheduled.");
        return Ok(());
    }

    for section in 0..engine.number_of_sections() {
        println!();
        println!("{}", engine.title_for_section(section).unwrap_or_default());
        for item in 0..engine.number_of_items(section) {
            let path = tracker_core::IndexPath::new(section, item);
            let Some(tracker) = engine.tracker_at(path) else {
                continue;
            };
            let mark = if engine.is_completed_on(tracker.id, day)? {
                "x"
            } else {
                " "
            };
            let count = engine.completed_days(tracker.id)?;
            println!(
                "  [{}] {} {:<24} {:<20} {} day{}  {}",
                mark,
                tracker.emoji,
                tracker.name,
                tracker.schedule.to_string(),
                count,
                if count == 1 { "" } else { "s" },
                short_id(tracker.id)
            );
        }
    }
    Ok(())
}

fn print_list_json(engine: &TrackerQueryEngine<Database>, day: NaiveDate) -> Result<()> {
    let mut sections = Vec::new();
    for section in engine.sections() {
        let mut trackers = Vec::new();
        for tracker in &section.trackers {
            let mut value = serde_json::to_value(tracker)?;
            value["completed"] = serde_json::json!(engine.is_completed_on(tracker.id, day)?);
            value["completed_days"] = serde_json::json!(engine.completed_days(tracker.id)?);
            trackers.push(value);
        }
        sections.push(serde_json::json!({
            "title": section.title,
            "trackers": trackers,
        }));
    }

    let output = serde_json::json!({
        "date": day,
        "sections": sections,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_events(events: &[QueryEvent]) {
    for event in events {
        match event {
            QueryEvent::WillChange => eprintln!("event: will_change"),
            QueryEvent::DidReloadAll => eprintln!("event: did_reload_all"),
            QueryEvent::DidChange(diff) => eprintln!(
                "event: did_change ({} change{}: +{} -{} ~{} moved {})",
                diff.change_count(),
                if diff.change_count() == 1 { "" } else { "s" },
                diff.inserted_items.len(),
                diff.deleted_items.len(),
                diff.updated_items.len(),
                diff.moved_items.len()
            ),
        }
    }
}
