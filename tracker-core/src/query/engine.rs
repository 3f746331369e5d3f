//! Tracker query engine
//!
//! Owns the currently visible, grouped view of trackers. Every mutation goes
//! through the [`RecordStore`] first; the view is recomputed only after the
//! write succeeded, and observers are told what changed.
//!
//! A mutation that was persisted returns `Ok` even when the re-read after it
//! fails. The view then stays stale until the next successful recompute.
//!
//! ```text
//!  filters ──┐
//!            ▼
//!  store.list_trackers() ─► predicate ─► GroupedView::build ─► diff vs. last view
//!                                                                  │
//!                                    ┌─────────────────────────────┴──────────┐
//!                                    ▼                                        ▼
//!                      RefreshPolicy::Diff                      RefreshPolicy::Reload
//!                  will_change + did_change(diff)                  did_reload_all
//! ```

use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::diff::{GroupedDiff, GroupedView, Section};
use super::filter::{CompletionFilter, TrackerFilter};
use super::observer::{ObserverId, ObserverList, TrackerObserver};
use crate::analytics::{self, StatisticsSummary};
use crate::config::Config;
use crate::error::{ConstraintViolation, Error, Result};
use crate::store::RecordStore;
use crate::types::{
    normalize_title, Category, CompletionRecord, IndexPath, NewTracker, Tracker, TrackerUpdate,
    Weekday,
};

/// How a recompute is reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Compute a section/row diff against the previous view
    Diff,
    /// Replace the whole list
    Reload,
}

/// Engine settings, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Category receiving trackers whose category was deleted
    pub uncategorized_title: String,
    /// Report filter changes as diffs instead of a full reload
    pub diff_filter_changes: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            uncategorized_title: normalize_title(&config.categories.uncategorized_title),
            diff_filter_changes: config.query.diff_filter_changes,
        }
    }
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Filtered, grouped view of trackers over a [`RecordStore`].
pub struct TrackerQueryEngine<S: RecordStore> {
    store: S,
    settings: EngineSettings,
    filter: TrackerFilter,
    selected_day: NaiveDate,
    view: GroupedView,
    observers: ObserverList,
    clock: Clock,
}

impl<S: RecordStore> TrackerQueryEngine<S> {
    /// Create an engine and load the initial, unfiltered view.
    pub fn new(store: S, settings: EngineSettings) -> Result<Self> {
        let clock: Clock = Box::new(|| Local::now().date_naive());
        let mut engine = Self {
            store,
            settings,
            filter: TrackerFilter::default(),
            selected_day: clock(),
            view: GroupedView::default(),
            observers: ObserverList::default(),
            clock,
        };
        engine.refresh(RefreshPolicy::Reload)?;
        Ok(engine)
    }

    /// Replace the source of "today" (used for future-date checks).
    ///
    /// Also moves the selected day to the new today.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.selected_day = clock();
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn filter(&self) -> &TrackerFilter {
        &self.filter
    }

    pub fn selected_day(&self) -> NaiveDate {
        self.selected_day
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    // ============================================
    // Observers
    // ============================================

    pub fn subscribe(&mut self, observer: Arc<dyn TrackerObserver>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ============================================
    // Filters
    // ============================================

    fn filter_policy(&self) -> RefreshPolicy {
        if self.settings.diff_filter_changes {
            RefreshPolicy::Diff
        } else {
            RefreshPolicy::Reload
        }
    }

    /// Show only trackers scheduled on `weekday`; `None` shows all.
    pub fn set_weekday_filter(&mut self, weekday: Option<Weekday>) -> Result<()> {
        self.filter.set_weekday(weekday);
        self.refresh(self.filter_policy()).map(|_| ())
    }

    /// Show only trackers whose name contains `text`. Blank text clears the search.
    pub fn set_search_text(&mut self, text: Option<&str>) -> Result<()> {
        self.filter.set_search_text(text);
        self.refresh(self.filter_policy()).map(|_| ())
    }

    pub fn set_completion_filter(&mut self, completion: CompletionFilter) -> Result<()> {
        self.filter.set_completion(completion);
        self.refresh(self.filter_policy()).map(|_| ())
    }

    /// Select a calendar day: filters by its weekday and evaluates the
    /// completion filter against it.
    pub fn select_day(&mut self, day: NaiveDate) -> Result<()> {
        self.selected_day = day;
        self.filter.set_weekday(Some(Weekday::of(day)));
        self.refresh(self.filter_policy()).map(|_| ())
    }

    /// Jump to today and drop the completion filter.
    pub fn show_today(&mut self) -> Result<()> {
        self.selected_day = self.today();
        self.filter.set_weekday(Some(Weekday::of(self.selected_day)));
        self.filter.set_completion(CompletionFilter::All);
        self.refresh(self.filter_policy()).map(|_| ())
    }

    // ============================================
    // Recompute
    // ============================================

    /// Re-read the store, rebuild the view and report the diff.
    ///
    /// Calling this twice without an intervening mutation yields an empty diff.
    pub fn recompute(&mut self) -> Result<GroupedDiff> {
        self.refresh(RefreshPolicy::Diff)
    }

    /// React to a change made to the store outside this engine.
    pub fn reload_from_store(&mut self) -> Result<()> {
        tracing::debug!("Store changed externally, recomputing");
        self.recompute().map(|_| ())
    }

    fn refresh(&mut self, policy: RefreshPolicy) -> Result<GroupedDiff> {
        let trackers = self.store.list_trackers().map_err(|e| {
            tracing::warn!(error = %e, "Failed to read trackers, keeping last view");
            e
        })?;

        let completed_on_day = if self.filter.completion() == CompletionFilter::All {
            HashSet::new()
        } else {
            self.completed_on(self.selected_day)?
        };

        let total = trackers.len();
        let visible: Vec<Tracker> = trackers
            .into_iter()
            .filter(|t| self.filter.matches(t, &completed_on_day))
            .collect();
        let next = GroupedView::build(visible);

        tracing::debug!(
            total,
            visible = next.len(),
            sections = next.number_of_sections(),
            ?policy,
            "Recomputed tracker view"
        );

        match policy {
            RefreshPolicy::Reload => {
                self.view = next;
                self.observers.did_reload_all();
                Ok(GroupedDiff::default())
            }
            RefreshPolicy::Diff => {
                let diff = self.view.diff(&next);
                if diff.is_empty() {
                    self.view = next;
                    return Ok(diff);
                }
                self.observers.will_change();
                self.view = next;
                self.observers.did_change(&diff);
                Ok(diff)
            }
        }
    }

    /// Recompute after a successful write. A read failure here is logged, not
    /// returned: the write is already persisted.
    fn refresh_after_write(&mut self) {
        if let Err(e) = self.refresh(RefreshPolicy::Diff) {
            tracing::warn!(
                error = %e,
                "Write persisted but view refresh failed, view is stale"
            );
        }
    }

    fn completed_on(&self, day: NaiveDate) -> Result<HashSet<Uuid>> {
        Ok(self
            .store
            .list_completions()?
            .into_iter()
            .filter(|r| r.day == day)
            .map(|r| r.tracker_id)
            .collect())
    }

    // ============================================
    // Grouped view access
    // ============================================

    pub fn view(&self) -> &GroupedView {
        &self.view
    }

    pub fn sections(&self) -> &[Section] {
        self.view.sections()
    }

    pub fn number_of_sections(&self) -> usize {
        self.view.number_of_sections()
    }

    pub fn number_of_items(&self, section: usize) -> usize {
        self.view.number_of_items(section)
    }

    pub fn title_for_section(&self, section: usize) -> Option<&str> {
        self.view.title_for_section(section)
    }

    pub fn tracker_at(&self, path: IndexPath) -> Option<&Tracker> {
        self.view.tracker_at(path)
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    // ============================================
    // Tracker operations
    // ============================================

    fn require_tracker(&self, id: Uuid) -> Result<Tracker> {
        self.store.get_tracker(id)?.ok_or(Error::TrackerNotFound(id))
    }

    /// Create a tracker; its category is created if it does not exist.
    pub fn add_tracker(&mut self, new: NewTracker) -> Result<Tracker> {
        if new.name.trim().is_empty() {
            return Err(ConstraintViolation::EmptyName.into());
        }
        if new.category.trim().is_empty() {
            return Err(ConstraintViolation::EmptyCategoryTitle.into());
        }

        let tracker = new.into_tracker();
        self.store.insert_tracker(&tracker)?;
        tracing::info!(
            tracker_id = %tracker.id,
            name = %tracker.name,
            category = %tracker.category,
            schedule = tracker.schedule.bits(),
            "Added tracker"
        );

        self.refresh_after_write();
        Ok(tracker)
    }

    /// Edit fields of an existing tracker in place.
    pub fn update_tracker(&mut self, id: Uuid, update: TrackerUpdate) -> Result<Tracker> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConstraintViolation::EmptyName.into());
        }
        if update.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConstraintViolation::EmptyCategoryTitle.into());
        }

        let mut tracker = self.require_tracker(id)?;
        if update.is_empty() {
            return Ok(tracker);
        }
        update.apply_to(&mut tracker);
        self.store.update_tracker(&tracker)?;
        tracing::info!(tracker_id = %id, "Updated tracker");

        self.refresh_after_write();
        Ok(tracker)
    }

    pub fn rename_tracker(&mut self, id: Uuid, name: &str) -> Result<Tracker> {
        self.update_tracker(id, TrackerUpdate::rename(name))
    }

    /// Delete a tracker and all of its completion records.
    ///
    /// Returns the number of completion records removed.
    pub fn delete_tracker(&mut self, id: Uuid) -> Result<usize> {
        let removed = self.store.delete_tracker(id)?;
        tracing::info!(tracker_id = %id, removed_completions = removed, "Deleted tracker");

        self.refresh_after_write();
        Ok(removed)
    }

    // ============================================
    // Category operations
    // ============================================

    pub fn categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories()
    }

    /// Get-or-create an (empty) category. Returns `true` if it was created.
    pub fn add_category(&mut self, title: &str) -> Result<bool> {
        let title = normalize_title(title);
        if title.is_empty() {
            return Err(ConstraintViolation::EmptyCategoryTitle.into());
        }
        let created = self.store.ensure_category(&title)?;
        if created {
            tracing::info!(category = %title, "Added category");
        }
        // empty categories are not shown, but keep the contract of recomputing after writes
        self.refresh_after_write();
        Ok(created)
    }

    /// Rename a category; its trackers keep their identity and follow it.
    pub fn rename_category(&mut self, old_title: &str, new_title: &str) -> Result<()> {
        let old_title = normalize_title(old_title);
        let new_title = normalize_title(new_title);
        if new_title.is_empty() {
            return Err(ConstraintViolation::EmptyCategoryTitle.into());
        }

        let categories = self.store.list_categories()?;
        if !categories.iter().any(|c| c.title == old_title) {
            return Err(Error::CategoryNotFound(old_title));
        }
        if old_title == new_title {
            return Ok(());
        }
        if categories.iter().any(|c| c.title == new_title) {
            return Err(ConstraintViolation::DuplicateCategory(new_title).into());
        }

        self.store.rename_category(&old_title, &new_title)?;
        tracing::info!(from = %old_title, to = %new_title, "Renamed category");

        self.refresh_after_write();
        Ok(())
    }

    /// Delete a category, moving its trackers to the uncategorized category.
    ///
    /// Returns the number of trackers reassigned.
    pub fn delete_category(&mut self, title: &str) -> Result<usize> {
        let title = normalize_title(title);
        let sentinel = self.settings.uncategorized_title.clone();

        if title == sentinel {
            let in_use = self
                .store
                .list_categories()?
                .iter()
                .any(|c| c.title == sentinel && c.tracker_count > 0);
            if in_use {
                return Err(ConstraintViolation::SentinelCategoryInUse(sentinel).into());
            }
        }

        let reassigned = self.store.delete_category(&title, &sentinel)?;
        tracing::info!(category = %title, reassigned, fallback = %sentinel, "Deleted category");

        self.refresh_after_write();
        Ok(reassigned)
    }

    // ============================================
    // Completion operations
    // ============================================

    /// Record that a tracker was done on `day`.
    ///
    /// Rejects days after today and duplicates before touching storage.
    pub fn mark_completed(&mut self, tracker_id: Uuid, day: NaiveDate) -> Result<()> {
        let today = self.today();
        if day > today {
            return Err(ConstraintViolation::FutureCompletion { day, today }.into());
        }
        self.require_tracker(tracker_id)?;

        let record = CompletionRecord::new(tracker_id, day);
        if self.store.has_completion(&record)? {
            return Err(ConstraintViolation::DuplicateCompletion { tracker_id, day }.into());
        }

        self.store.insert_completion(&record)?;
        tracing::info!(tracker_id = %tracker_id, %day, "Marked tracker completed");

        self.refresh_after_write();
        Ok(())
    }

    /// Remove a completion. Returns `false` if there was none.
    pub fn unmark_completed(&mut self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        let removed = self
            .store
            .delete_completion(&CompletionRecord::new(tracker_id, day))?;
        if removed {
            tracing::info!(tracker_id = %tracker_id, %day, "Unmarked tracker completion");
            self.refresh_after_write();
        }
        Ok(removed)
    }

    /// Flip the completion state for `day`. Returns `true` if it is now completed.
    pub fn toggle_completion(&mut self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        let today = self.today();
        if day > today {
            return Err(ConstraintViolation::FutureCompletion { day, today }.into());
        }

        if self.is_completed_on(tracker_id, day)? {
            self.unmark_completed(tracker_id, day)?;
            Ok(false)
        } else {
            self.mark_completed(tracker_id, day)?;
            Ok(true)
        }
    }

    pub fn is_completed_on(&self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        self.store
            .has_completion(&CompletionRecord::new(tracker_id, day))
    }

    /// Number of days a tracker has been completed on.
    pub fn completed_days(&self, tracker_id: Uuid) -> Result<i64> {
        let records = self.store.list_completions()?;
        Ok(analytics::completion_counts(&records)
            .get(&tracker_id)
            .copied()
            .unwrap_or(0))
    }

    // ============================================
    // Statistics
    // ============================================

    /// Statistics over every stored completion record.
    pub fn statistics(&self) -> Result<StatisticsSummary> {
        let records = self.store.list_completions()?;
        Ok(analytics::compute_statistics(&records))
    }

    /// Run of consecutive active days ending today.
    pub fn current_streak(&self) -> Result<i64> {
        let records = self.store.list_completions()?;
        Ok(analytics::current_streak(&records, self.today()))
    }
}
