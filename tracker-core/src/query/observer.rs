//! Observers of the grouped tracker view.

use std::sync::{Arc, Mutex, PoisonError};

use super::diff::GroupedDiff;

/// Receives change notifications from the query engine.
///
/// A granular change arrives as `will_change` followed by `did_change`;
/// a wholesale replacement of the list arrives as `did_reload_all` alone.
pub trait TrackerObserver: Send + Sync {
    fn will_change(&self) {}

    fn did_change(&self, diff: &GroupedDiff) {
        let _ = diff;
    }

    fn did_reload_all(&self) {}
}

/// Handle returned by subscribe, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// One notification as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    WillChange,
    DidChange(GroupedDiff),
    DidReloadAll,
}

/// Observer that records every event it receives.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<QueryEvent>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, event: QueryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Copy of all recorded events.
    pub fn events(&self) -> Vec<QueryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<QueryEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl TrackerObserver for EventLog {
    fn will_change(&self) {
        self.push(QueryEvent::WillChange);
    }

    fn did_change(&self, diff: &GroupedDiff) {
        self.push(QueryEvent::DidChange(diff.clone()));
    }

    fn did_reload_all(&self) {
        self.push(QueryEvent::DidReloadAll);
    }
}

/// Registered observers in subscription order.
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn TrackerObserver>)>,
}

impl ObserverList {
    pub(crate) fn subscribe(&mut self, observer: Arc<dyn TrackerObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn will_change(&self) {
        for (_, observer) in &self.observers {
            observer.will_change();
        }
    }

    pub(crate) fn did_change(&self, diff: &GroupedDiff) {
        for (_, observer) in &self.observers {
            observer.did_change(diff);
        }
    }

    pub(crate) fn did_reload_all(&self) {
        for (_, observer) in &self.observers {
            observer.did_reload_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_records_in_order() {
        let log = EventLog::new();
        let mut list = ObserverList::default();
        list.subscribe(log.clone());

        list.will_change();
        list.did_change(&GroupedDiff::default());
        list.did_reload_all();

        assert_eq!(
            log.take(),
            vec![
                QueryEvent::WillChange,
                QueryEvent::DidChange(GroupedDiff::default()),
                QueryEvent::DidReloadAll,
            ]
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let log = EventLog::new();
        let mut list = ObserverList::default();
        let id = list.subscribe(log.clone());
        let other = list.subscribe(EventLog::new());
        assert_ne!(id, other);

        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        assert_eq!(list.len(), 1);

        list.did_reload_all();
        assert!(log.events().is_empty());
    }
}
