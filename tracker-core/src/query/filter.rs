//! Visibility predicate for the tracker list.

use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::types::{Tracker, Weekday};

/// Fold text for case- and diacritic-insensitive comparison.
///
/// Decomposes to NFD, drops combining marks and lowercases, so
/// `"Café"` and `"cafe"` fold to the same string.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Which trackers to show relative to the selected day's completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompletionFilter {
    #[default]
    All,
    /// Completed on the selected day
    Completed,
    /// Not completed on the selected day
    Uncompleted,
}

impl CompletionFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionFilter::All => "all",
            CompletionFilter::Completed => "completed",
            CompletionFilter::Uncompleted => "uncompleted",
        }
    }
}

impl std::str::FromStr for CompletionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CompletionFilter::All),
            "completed" | "done" => Ok(CompletionFilter::Completed),
            "uncompleted" | "pending" => Ok(CompletionFilter::Uncompleted),
            _ => Err(format!("unknown completion filter: {}", s)),
        }
    }
}

/// Active filters of the query engine. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerFilter {
    weekday: Option<Weekday>,
    search_text: Option<String>,
    folded_search: Option<String>,
    completion: CompletionFilter,
}

impl TrackerFilter {
    pub fn weekday(&self) -> Option<Weekday> {
        self.weekday
    }

    pub fn set_weekday(&mut self, weekday: Option<Weekday>) {
        self.weekday = weekday;
    }

    /// Trimmed search text, `None` when no search is active.
    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    /// Set the search text. Whitespace is trimmed; blank text clears the search.
    pub fn set_search_text(&mut self, text: Option<&str>) {
        let trimmed = text.map(str::trim).filter(|t| !t.is_empty());
        self.search_text = trimmed.map(str::to_string);
        self.folded_search = trimmed.map(fold);
    }

    pub fn completion(&self) -> CompletionFilter {
        self.completion
    }

    pub fn set_completion(&mut self, completion: CompletionFilter) {
        self.completion = completion;
    }

    /// Whether any filter is set.
    pub fn is_active(&self) -> bool {
        self.weekday.is_some()
            || self.search_text.is_some()
            || self.completion != CompletionFilter::All
    }

    /// Evaluate the predicate for one tracker.
    ///
    /// `completed_on_day` holds the trackers completed on the selected day and
    /// is only consulted when the completion filter is not [`CompletionFilter::All`].
    pub fn matches(&self, tracker: &Tracker, completed_on_day: &HashSet<Uuid>) -> bool {
        if let Some(day) = self.weekday {
            if !tracker.is_scheduled_on(day) {
                return false;
            }
        }

        if let Some(needle) = &self.folded_search {
            if !fold(&tracker.name).contains(needle.as_str()) {
                return false;
            }
        }

        match self.completion {
            CompletionFilter::All => true,
            CompletionFilter::Completed => completed_on_day.contains(&tracker.id),
            CompletionFilter::Uncompleted => !completed_on_day.contains(&tracker.id),
        }
    }
}
