//! Integration tests for the tracker query engine and statistics
//!
//! These tests drive the engine against a real SQLite database (in memory or
//! in a temp directory) to verify the store → view → statistics flow.

use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use tempfile::TempDir;
use tracker_core::analytics::compute_statistics;
use tracker_core::query::{EventLog, QueryEvent};
use tracker_core::{
    Color, CompletionRecord, Database, EngineSettings, Error, IndexPath, NewTracker, RecordStore,
    StatisticsSummary, Tracker, TrackerQueryEngine, TrackerUpdate, Weekday, WeekdayMask,
};
use uuid::Uuid;

/// 2024-06-10 is a Monday
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn migrated_db() -> Database {
    tracker_core::logging::init_test();
    let db = Database::open_in_memory().expect("failed to open database");
    db.migrate().expect("failed to migrate");
    db
}

fn engine() -> TrackerQueryEngine<Database> {
    TrackerQueryEngine::new(migrated_db(), EngineSettings::default())
        .expect("failed to create engine")
        .with_clock(|| monday() + Duration::days(30))
}

fn new_tracker(name: &str, category: &str, days: &[Weekday]) -> NewTracker {
    NewTracker {
        name: name.to_string(),
        emoji: "⭐".to_string(),
        color: Color::from_hex("#33A1FD").unwrap(),
        category: category.to_string(),
        schedule: days.iter().copied().collect::<WeekdayMask>(),
    }
}

fn visible(engine: &TrackerQueryEngine<Database>) -> Vec<Tracker> {
    let mut out = Vec::new();
    for section in 0..engine.number_of_sections() {
        for item in 0..engine.number_of_items(section) {
            out.push(
                engine
                    .tracker_at(IndexPath::new(section, item))
                    .expect("index path in range")
                    .clone(),
            );
        }
    }
    out
}

/// A small fixture with varied schedules, categories and names.
fn seed(engine: &mut TrackerQueryEngine<Database>) -> Vec<Tracker> {
    use Weekday::*;
    let specs: [(&str, &str, &[Weekday]); 6] = [
        ("Morning Run", "Sport", &[Monday, Wednesday, Friday]),
        ("Swim", "Sport", &[Tuesday, Thursday]),
        (
            "Read a chapter",
            "Study",
            &[Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday],
        ),
        ("Flashcards", "Study", &[Saturday, Sunday]),
        ("Water plants", "Home", &[Sunday]),
        ("Someday", "Home", &[]),
    ];
    specs
        .iter()
        .map(|(name, category, days)| {
            engine
                .add_tracker(new_tracker(name, category, days))
                .expect("failed to add tracker")
        })
        .collect()
}

// ============================================
// Filtering
// ============================================

#[test]
fn test_weekday_filter_returns_only_scheduled_trackers() {
    let mut engine = engine();
    let all = seed(&mut engine);

    for day in Weekday::ALL {
        engine.set_weekday_filter(Some(day)).unwrap();
        let shown: HashSet<Uuid> = visible(&engine).iter().map(|t| t.id).collect();

        for tracker in &all {
            assert_eq!(
                shown.contains(&tracker.id),
                tracker.schedule.contains(day),
                "{} on {}",
                tracker.name,
                day
            );
        }
    }

    engine.set_weekday_filter(None).unwrap();
    assert_eq!(visible(&engine).len(), all.len());
}

#[test]
fn test_monday_friday_mask() {
    let mut engine = engine();
    let gym = engine
        .add_tracker(new_tracker("Gym", "Sport", &[Weekday::Monday, Weekday::Friday]))
        .unwrap();
    assert_eq!(gym.schedule.bits(), 0x22);

    for day in Weekday::ALL {
        engine.set_weekday_filter(Some(day)).unwrap();
        let expected = matches!(day, Weekday::Monday | Weekday::Friday);
        assert_eq!(!engine.is_empty(), expected, "{}", day);
    }
}

#[test]
fn test_search_is_case_insensitive_and_clearable() {
    let mut engine = engine();
    seed(&mut engine);
    engine.set_weekday_filter(Some(Weekday::Monday)).unwrap();
    let weekday_only = visible(&engine);

    engine.set_search_text(Some("READ")).unwrap();
    let found = visible(&engine);
    assert_eq!(found.len(), 1);
    assert!(found
        .iter()
        .all(|t| t.name.to_lowercase().contains("read")));

    engine.set_search_text(Some("")).unwrap();
    assert_eq!(visible(&engine), weekday_only);

    engine.set_search_text(Some("r")).unwrap();
    engine.set_search_text(None).unwrap();
    assert_eq!(visible(&engine), weekday_only);
}

// ============================================
// Grouping and diffs
// ============================================

#[test]
fn test_recompute_is_idempotent() {
    let mut engine = engine();
    seed(&mut engine);

    let first_view = engine.view().clone();
    let first = engine.recompute().unwrap();
    let second = engine.recompute().unwrap();

    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(engine.view(), &first_view);
}

#[test]
fn test_grouping_ignores_insertion_order() {
    let specs = [
        ("b", "Zeta"),
        ("a", "Zeta"),
        ("Écrire", "alpha"),
        ("edit", "alpha"),
        ("c", "Mid"),
    ];

    let mut forward = engine();
    for (name, category) in specs {
        forward
            .add_tracker(new_tracker(name, category, &[Weekday::Monday]))
            .unwrap();
    }
    let mut backward = engine();
    for (name, category) in specs.iter().rev() {
        backward
            .add_tracker(new_tracker(name, category, &[Weekday::Monday]))
            .unwrap();
    }

    let layout = |engine: &TrackerQueryEngine<Database>| -> Vec<(String, Vec<String>)> {
        engine
            .sections()
            .iter()
            .map(|s| (s.title.clone(), s.trackers.iter().map(|t| t.name.clone()).collect()))
            .collect()
    };

    let expected = vec![
        ("alpha".to_string(), vec!["Écrire".to_string(), "edit".to_string()]),
        ("Mid".to_string(), vec!["c".to_string()]),
        ("Zeta".to_string(), vec!["a".to_string(), "b".to_string()]),
    ];
    assert_eq!(layout(&forward), expected);
    assert_eq!(layout(&backward), expected);
}

#[test]
fn test_moving_tracker_between_categories_reports_move() {
    let mut engine = engine();
    let run = engine
        .add_tracker(new_tracker("Run", "Sport", &[Weekday::Monday]))
        .unwrap();
    engine
        .add_tracker(new_tracker("Read", "Study", &[Weekday::Monday]))
        .unwrap();

    let log = EventLog::new();
    engine.subscribe(log.clone());

    let update = TrackerUpdate {
        category: Some("Study".to_string()),
        ..Default::default()
    };
    engine.update_tracker(run.id, update).unwrap();

    let events = log.take();
    assert_eq!(events.first(), Some(&QueryEvent::WillChange));
    let Some(QueryEvent::DidChange(diff)) = events.get(1) else {
        panic!("expected did_change, got {:?}", events);
    };
    // Sport disappears, Study now holds Read then Run
    assert_eq!(diff.deleted_sections.iter().copied().collect::<Vec<_>>(), vec![0]);
    assert!(diff.inserted_sections.is_empty());
    assert_eq!(
        diff.moved_items,
        vec![(IndexPath::new(0, 0), IndexPath::new(0, 1))]
    );
    assert_eq!(engine.title_for_section(0), Some("Study"));
}

// ============================================
// Statistics
// ============================================

#[test]
fn test_statistics_of_nothing_is_zero() {
    assert_eq!(
        compute_statistics(&[]),
        StatisticsSummary {
            best_streak: 0,
            ideal_days: 0,
            completed_total: 0,
            average_per_day: 0,
        }
    );
    assert!(engine().statistics().unwrap().is_empty());
}

#[test]
fn test_best_streak_scenario() {
    let mut engine = engine();
    let a = engine.add_tracker(new_tracker("A", "X", &[])).unwrap();
    let b = engine.add_tracker(new_tracker("B", "X", &[])).unwrap();
    let d = monday();

    engine.mark_completed(a.id, d).unwrap();
    engine.mark_completed(b.id, d + Duration::days(1)).unwrap();
    engine.mark_completed(a.id, d + Duration::days(2)).unwrap();
    engine.mark_completed(b.id, d + Duration::days(10)).unwrap();

    assert_eq!(engine.statistics().unwrap().best_streak, 3);
}

#[test]
fn test_ideal_days_scenario() {
    let mut engine = engine();
    let a = engine.add_tracker(new_tracker("A", "X", &[])).unwrap();
    let b = engine.add_tracker(new_tracker("B", "X", &[])).unwrap();
    let x = monday();
    let y = monday() + Duration::days(1);

    engine.mark_completed(a.id, x).unwrap();
    engine.mark_completed(b.id, x).unwrap();
    engine.mark_completed(a.id, y).unwrap();

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.ideal_days, 1);
    assert_eq!(stats.completed_total, 3);
}

#[test]
fn test_average_rounds_half_to_even() {
    let mut engine = engine();
    let trackers: Vec<Tracker> = (0..3)
        .map(|i| {
            engine
                .add_tracker(new_tracker(&format!("T{i}"), "X", &[]))
                .unwrap()
        })
        .collect();

    // 3 + 3 + 2 + 2 = 10 completions over 4 days
    for (offset, count) in [(0, 3), (1, 3), (2, 2), (3, 2)] {
        for tracker in trackers.iter().take(count) {
            engine
                .mark_completed(tracker.id, monday() + Duration::days(offset))
                .unwrap();
        }
    }

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.completed_total, 10);
    assert_eq!(stats.average_per_day, 2);
}

#[test]
fn test_delete_cascades_to_view_and_statistics() {
    let mut engine = engine();
    let a = engine.add_tracker(new_tracker("A", "X", &[Weekday::Monday])).unwrap();
    let b = engine.add_tracker(new_tracker("B", "X", &[Weekday::Monday])).unwrap();
    let x = monday();
    let y = monday() + Duration::days(1);

    engine.mark_completed(a.id, x).unwrap();
    engine.mark_completed(b.id, x).unwrap();
    engine.mark_completed(a.id, y).unwrap();
    engine.mark_completed(b.id, y + Duration::days(1)).unwrap();
    assert_eq!(engine.statistics().unwrap().ideal_days, 1);

    let removed = engine.delete_tracker(b.id).unwrap();
    assert_eq!(removed, 2);

    for day in Weekday::ALL {
        engine.set_weekday_filter(Some(day)).unwrap();
        assert!(visible(&engine).iter().all(|t| t.id != b.id));
    }

    let remaining = engine.store().list_completions().unwrap();
    assert!(remaining.iter().all(|r| r.tracker_id != b.id));

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.completed_total, 2);
    // {A} is now the global set, so both of A's days are ideal
    assert_eq!(stats.ideal_days, 2);
}

// ============================================
// Errors
// ============================================

#[test]
fn test_future_and_duplicate_completions_are_constraint_errors() {
    let mut engine = TrackerQueryEngine::new(migrated_db(), EngineSettings::default())
        .unwrap()
        .with_clock(monday);
    let a = engine.add_tracker(new_tracker("A", "X", &[])).unwrap();

    let future = engine
        .mark_completed(a.id, monday() + Duration::days(1))
        .unwrap_err();
    assert!(matches!(future, Error::Constraint(_)));
    assert!(!future.is_storage());

    engine.mark_completed(a.id, monday()).unwrap();
    let duplicate = engine.mark_completed(a.id, monday()).unwrap_err();
    assert!(matches!(duplicate, Error::Constraint(_)));

    assert_eq!(
        engine.store().list_completions().unwrap(),
        vec![CompletionRecord::new(a.id, monday())]
    );
}

#[test]
fn test_unknown_tracker() {
    let mut engine = engine();
    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.mark_completed(missing, monday()),
        Err(Error::TrackerNotFound(id)) if id == missing
    ));
    assert!(matches!(
        engine.delete_tracker(missing),
        Err(Error::TrackerNotFound(_))
    ));
}

// ============================================
// Persistence
// ============================================

#[test]
fn test_state_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracker.db");

    let kept = {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        let mut engine = TrackerQueryEngine::new(db, EngineSettings::default())
            .unwrap()
            .with_clock(monday);
        let kept = engine
            .add_tracker(new_tracker("Stretch", "Morning", &[Weekday::Monday]))
            .unwrap();
        engine.mark_completed(kept.id, monday()).unwrap();
        engine.delete_category("Morning").unwrap();
        kept
    };

    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let engine = TrackerQueryEngine::new(db, EngineSettings::default()).unwrap();

    let shown = visible(&engine);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, kept.id);
    assert_eq!(shown[0].color, kept.color);
    assert_eq!(shown[0].category, "Uncategorized");
    assert!(engine
        .categories()
        .unwrap()
        .iter()
        .all(|c| c.title != "Morning"));
    assert!(engine.is_completed_on(kept.id, monday()).unwrap());
}

#[test]
fn test_external_change_is_picked_up() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracker.db");
    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let mut engine = TrackerQueryEngine::new(db, EngineSettings::default()).unwrap();
    let log = EventLog::new();
    engine.subscribe(log.clone());

    // another connection writes behind the engine's back
    let other = Database::open(&path).unwrap();
    let tracker = Tracker {
        id: Uuid::new_v4(),
        name: "Journal".to_string(),
        emoji: "📓".to_string(),
        color: Color::BLACK,
        schedule: WeekdayMask::EVERY_DAY,
        category: "Evening".to_string(),
    };
    other.insert_tracker(&tracker).unwrap();

    assert!(engine.is_empty());
    engine.reload_from_store().unwrap();
    assert_eq!(visible(&engine), vec![tracker]);
    assert_eq!(log.events().len(), 2);
}
