//! Completion statistics.
//!
//! Pure aggregation over completion records: nothing is cached, every call
//! recomputes from the full record set.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::types::CompletionRecord;

/// The four numbers shown on the statistics screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSummary {
    /// Longest run of consecutive days with at least one completion
    pub best_streak: i64,
    /// Days on which every tracker that was ever completed was completed
    pub ideal_days: i64,
    /// Total number of completion records
    pub completed_total: i64,
    /// `completed_total / active days`, rounded half to even
    pub average_per_day: i64,
}

impl StatisticsSummary {
    /// True when there is nothing to show (no completions at all).
    pub fn is_empty(&self) -> bool {
        self.completed_total == 0
    }
}

/// Compute the statistics summary for a set of completion records.
///
/// Streaks count days with a completion of *any* tracker, not per-tracker runs.
/// Duplicate records are counted as given; the store never produces them.
pub fn compute_statistics(records: &[CompletionRecord]) -> StatisticsSummary {
    if records.is_empty() {
        return StatisticsSummary::default();
    }

    // day -> trackers completed that day (BTreeMap keeps days sorted)
    let mut by_day: BTreeMap<NaiveDate, HashSet<Uuid>> = BTreeMap::new();
    let mut all_trackers: HashSet<Uuid> = HashSet::new();
    for record in records {
        by_day.entry(record.day).or_default().insert(record.tracker_id);
        all_trackers.insert(record.tracker_id);
    }

    let completed_total = records.len() as i64;
    let active_days = by_day.len() as i64;

    let best_streak = longest_streak(by_day.keys().copied());

    let ideal_days = if all_trackers.is_empty() {
        0
    } else {
        by_day
            .values()
            .filter(|trackers| **trackers == all_trackers)
            .count() as i64
    };

    StatisticsSummary {
        best_streak,
        ideal_days,
        completed_total,
        average_per_day: div_round_half_even(completed_total, active_days.max(1)),
    }
}

/// Longest run of consecutive calendar days in an ascending day sequence.
fn longest_streak(days: impl Iterator<Item = NaiveDate>) -> i64 {
    let mut longest = 0i64;
    let mut streak = 0i64;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        match prev {
            Some(p) if (day - p).num_days() == 1 => streak += 1,
            _ => streak = 1,
        }
        longest = longest.max(streak);
        prev = Some(day);
    }

    longest
}

/// Integer division rounding to nearest, ties to even (banker's rounding).
///
/// 10 / 4 = 2.5 rounds to 2, 14 / 4 = 3.5 rounds to 4.
fn div_round_half_even(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);

    match twice_remainder.cmp(&denominator) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 0 => quotient,
        std::cmp::Ordering::Equal => quotient + 1,
    }
}

/// Number of completed days per tracker.
pub fn completion_counts(records: &[CompletionRecord]) -> HashMap<Uuid, i64> {
    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for record in records {
        *counts.entry(record.tracker_id).or_insert(0) += 1;
    }
    counts
}

/// Consecutive active days ending today.
///
/// A streak that ended yesterday still counts, since today may not be done yet.
pub fn current_streak(records: &[CompletionRecord], today: NaiveDate) -> i64 {
    let days: HashSet<NaiveDate> = records.iter().map(|r| r.day).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0i64;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}
