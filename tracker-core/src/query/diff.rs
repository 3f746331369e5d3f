//! Grouped tracker view and the section/row diff between two views.
//!
//! Sections are categories sorted by title; rows are trackers sorted by
//! name, then id. Both comparisons use the folded (case and diacritic
//! insensitive) string first and the raw string second, so ordering is
//! total and depends only on (category title, tracker name, tracker id).

use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use super::filter::fold;
use crate::types::{IndexPath, Tracker};

/// One category with its visible trackers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub trackers: Vec<Tracker>,
}

/// Filtered trackers grouped by category, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedView {
    sections: Vec<Section>,
}

impl GroupedView {
    /// Group and sort a set of trackers.
    pub fn build(mut trackers: Vec<Tracker>) -> Self {
        trackers.sort_by_cached_key(|t| {
            (
                fold(&t.category),
                t.category.clone(),
                fold(&t.name),
                t.name.clone(),
                t.id,
            )
        });

        let mut sections: Vec<Section> = Vec::new();
        for tracker in trackers {
            let starts_section = sections
                .last()
                .map_or(true, |s| s.title != tracker.category);
            if starts_section {
                sections.push(Section {
                    title: tracker.category.clone(),
                    trackers: Vec::new(),
                });
            }
            if let Some(section) = sections.last_mut() {
                section.trackers.push(tracker);
            }
        }

        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    /// Row count of a section, 0 for an out-of-range index.
    pub fn number_of_items(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |s| s.trackers.len())
    }

    pub fn title_for_section(&self, section: usize) -> Option<&str> {
        self.sections.get(section).map(|s| s.title.as_str())
    }

    pub fn tracker_at(&self, path: IndexPath) -> Option<&Tracker> {
        self.sections
            .get(path.section)
            .and_then(|s| s.trackers.get(path.item))
    }

    /// Where a tracker currently sits, if it is visible.
    pub fn index_path_of(&self, id: Uuid) -> Option<IndexPath> {
        self.iter()
            .find(|(_, tracker)| tracker.id == id)
            .map(|(path, _)| path)
    }

    /// Total visible trackers.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.trackers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// All rows in display order with their index paths.
    pub fn iter(&self) -> impl Iterator<Item = (IndexPath, &Tracker)> {
        self.sections.iter().enumerate().flat_map(|(s, section)| {
            section
                .trackers
                .iter()
                .enumerate()
                .map(move |(i, tracker)| (IndexPath::new(s, i), tracker))
        })
    }

    /// Changes that turn `self` into `next`.
    pub fn diff(&self, next: &GroupedView) -> GroupedDiff {
        let mut diff = GroupedDiff::default();

        let old_titles: HashSet<&str> = self.sections.iter().map(|s| s.title.as_str()).collect();
        let new_titles: HashSet<&str> = next.sections.iter().map(|s| s.title.as_str()).collect();

        for (i, section) in self.sections.iter().enumerate() {
            if !new_titles.contains(section.title.as_str()) {
                diff.deleted_sections.insert(i);
            }
        }
        for (i, section) in next.sections.iter().enumerate() {
            if !old_titles.contains(section.title.as_str()) {
                diff.inserted_sections.insert(i);
            }
        }

        let old_rows: HashMap<Uuid, (IndexPath, &Tracker)> =
            self.iter().map(|(path, t)| (t.id, (path, t))).collect();
        let new_rows: HashMap<Uuid, (IndexPath, &Tracker)> =
            next.iter().map(|(path, t)| (t.id, (path, t))).collect();

        for (path, tracker) in self.iter() {
            if !new_rows.contains_key(&tracker.id) {
                diff.deleted_items.push(path);
            }
        }
        for (path, tracker) in next.iter() {
            if !old_rows.contains_key(&tracker.id) {
                diff.inserted_items.push(path);
            }
        }

        let moved = self.moved_rows(next, &new_rows);

        for (new_path, tracker) in next.iter() {
            let Some((old_path, old_tracker)) = old_rows.get(&tracker.id) else {
                continue;
            };
            if moved.contains(&tracker.id) {
                diff.moved_items.push((*old_path, new_path));
            } else if *old_tracker != tracker {
                diff.updated_items.push(*old_path);
            }
        }
        diff.updated_items.sort();

        diff
    }

    /// Surviving rows whose section changed or whose order among the other
    /// survivors of their section changed. Keeps a longest increasing
    /// subsequence in place so the move set is minimal.
    fn moved_rows(
        &self,
        next: &GroupedView,
        new_rows: &HashMap<Uuid, (IndexPath, &Tracker)>,
    ) -> HashSet<Uuid> {
        let mut moved = HashSet::new();

        for section in &self.sections {
            // (id, new item index) of rows staying in this section, in old order
            let mut staying: Vec<(Uuid, usize)> = Vec::new();
            for tracker in &section.trackers {
                let Some((new_path, _)) = new_rows.get(&tracker.id) else {
                    continue;
                };
                if next.sections[new_path.section].title == section.title {
                    staying.push((tracker.id, new_path.item));
                } else {
                    moved.insert(tracker.id);
                }
            }

            let positions: Vec<usize> = staying.iter().map(|(_, item)| *item).collect();
            let keep = longest_increasing_subsequence(&positions);
            for ((id, _), kept) in staying.iter().zip(keep) {
                if !kept {
                    moved.insert(*id);
                }
            }
        }

        moved
    }
}

/// Marks the members of one longest strictly increasing subsequence.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = prev[i];
    }
    keep
}

/// Section and row changes between two grouped views.
///
/// Deleted sections/items and the `from` side of moves refer to the old view;
/// inserted sections/items and the `to` side of moves refer to the new view.
/// Updated items use old index paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedDiff {
    pub inserted_sections: BTreeSet<usize>,
    pub deleted_sections: BTreeSet<usize>,
    pub inserted_items: Vec<IndexPath>,
    pub deleted_items: Vec<IndexPath>,
    pub updated_items: Vec<IndexPath>,
    pub moved_items: Vec<(IndexPath, IndexPath)>,
}

impl GroupedDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted_sections.is_empty()
            && self.deleted_sections.is_empty()
            && self.inserted_items.is_empty()
            && self.deleted_items.is_empty()
            && self.updated_items.is_empty()
            && self.moved_items.is_empty()
    }

    /// Total number of section and row changes.
    pub fn change_count(&self) -> usize {
        self.inserted_sections.len()
            + self.deleted_sections.len()
            + self.inserted_items.len()
            + self.deleted_items.len()
            + self.updated_items.len()
            + self.moved_items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, WeekdayMask};

    fn tracker(name: &str, category: &str) -> Tracker {
        Tracker {
            id: Uuid::new_v4(),
            name: name.to_string(),
            emoji: "⭐".to_string(),
            color: Color::BLACK,
            schedule: WeekdayMask::EVERY_DAY,
            category: category.to_string(),
        }
    }

    fn names(view: &GroupedView) -> Vec<(String, Vec<String>)> {
        view.sections()
            .iter()
            .map(|s| {
                (
                    s.title.clone(),
                    s.trackers.iter().map(|t| t.name.clone()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_build_groups_and_sorts() {
        let view = GroupedView::build(vec![
            tracker("walk", "Sport"),
            tracker("Read", "Études"),
            tracker("Apple", "Sport"),
            tracker("écrire", "Études"),
        ]);

        assert_eq!(
            names(&view),
            vec![
                ("Études".to_string(), vec!["écrire".to_string(), "Read".to_string()]),
                ("Sport".to_string(), vec!["Apple".to_string(), "walk".to_string()]),
            ]
        );
        assert_eq!(view.len(), 4);
        assert_eq!(view.number_of_items(1), 2);
        assert_eq!(view.number_of_items(9), 0);
        assert_eq!(view.title_for_section(0), Some("Études"));
        assert_eq!(view.tracker_at(IndexPath::new(1, 1)).unwrap().name, "walk");
        assert!(view.tracker_at(IndexPath::new(2, 0)).is_none());
    }

    #[test]
    fn test_build_ignores_insertion_order() {
        let trackers = vec![
            tracker("b", "X"),
            tracker("a", "Y"),
            tracker("c", "X"),
            tracker("a", "X"),
        ];
        let mut reversed = trackers.clone();
        reversed.reverse();
        assert_eq!(GroupedView::build(trackers), GroupedView::build(reversed));
    }

    #[test]
    fn test_equal_names_tie_break_on_id() {
        let mut a = tracker("Same", "X");
        let mut b = tracker("Same", "X");
        a.id = Uuid::from_u128(2);
        b.id = Uuid::from_u128(1);
        let view = GroupedView::build(vec![a.clone(), b.clone()]);
        assert_eq!(view.tracker_at(IndexPath::new(0, 0)).unwrap().id, b.id);
        assert_eq!(view.index_path_of(a.id), Some(IndexPath::new(0, 1)));
    }

    #[test]
    fn test_identical_views_have_empty_diff() {
        let view = GroupedView::build(vec![tracker("a", "X"), tracker("b", "Y")]);
        let diff = view.diff(&view.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_insert_into_existing_section() {
        let a = tracker("a", "X");
        let c = tracker("c", "X");
        let b = tracker("b", "X");
        let old = GroupedView::build(vec![a.clone(), c.clone()]);
        let new = GroupedView::build(vec![a, b, c]);

        let diff = old.diff(&new);
        assert_eq!(diff.inserted_items, vec![IndexPath::new(0, 1)]);
        assert!(diff.moved_items.is_empty());
        assert!(diff.inserted_sections.is_empty());
        assert!(diff.updated_items.is_empty());
    }

    #[test]
    fn test_insert_new_section() {
        let a = tracker("a", "X");
        let old = GroupedView::build(vec![a.clone()]);
        let new = GroupedView::build(vec![tracker("z", "A"), a]);

        let diff = old.diff(&new);
        assert_eq!(diff.inserted_sections, BTreeSet::from([0]));
        assert_eq!(diff.inserted_items, vec![IndexPath::new(0, 0)]);
        assert!(diff.moved_items.is_empty(), "section shift is not a move");
    }

    #[test]
    fn test_delete_last_row_deletes_section() {
        let a = tracker("a", "X");
        let b = tracker("b", "Y");
        let old = GroupedView::build(vec![a.clone(), b]);
        let new = GroupedView::build(vec![a]);

        let diff = old.diff(&new);
        assert_eq!(diff.deleted_sections, BTreeSet::from([1]));
        assert_eq!(diff.deleted_items, vec![IndexPath::new(1, 0)]);
    }

    #[test]
    fn test_rename_keeping_order_is_update() {
        let a = tracker("a", "X");
        let b = tracker("b", "X");
        let old = GroupedView::build(vec![a.clone(), b.clone()]);

        let mut renamed = a.clone();
        renamed.name = "aa".to_string();
        let new = GroupedView::build(vec![renamed, b]);

        let diff = old.diff(&new);
        assert_eq!(diff.updated_items, vec![IndexPath::new(0, 0)]);
        assert!(diff.moved_items.is_empty());
    }

    #[test]
    fn test_rename_changing_order_is_move() {
        let a = tracker("a", "X");
        let b = tracker("b", "X");
        let c = tracker("c", "X");
        let old = GroupedView::build(vec![a.clone(), b.clone(), c.clone()]);

        let mut renamed = a.clone();
        renamed.name = "d".to_string();
        let new = GroupedView::build(vec![renamed, b, c]);

        let diff = old.diff(&new);
        assert_eq!(
            diff.moved_items,
            vec![(IndexPath::new(0, 0), IndexPath::new(0, 2))]
        );
        assert!(diff.updated_items.is_empty());
        assert!(diff.inserted_items.is_empty());
        assert!(diff.deleted_items.is_empty());
    }

    #[test]
    fn test_category_change_is_move() {
        let a = tracker("a", "X");
        let b = tracker("b", "X");
        let old = GroupedView::build(vec![a.clone(), b.clone()]);

        let mut recategorized = a.clone();
        recategorized.category = "Y".to_string();
        let new = GroupedView::build(vec![recategorized, b]);

        let diff = old.diff(&new);
        assert_eq!(diff.inserted_sections, BTreeSet::from([1]));
        assert_eq!(
            diff.moved_items,
            vec![(IndexPath::new(0, 0), IndexPath::new(1, 0))]
        );
    }

    #[test]
    fn test_lis() {
        assert_eq!(
            longest_increasing_subsequence(&[2, 0, 1]),
            vec![false, true, true]
        );
        assert_eq!(longest_increasing_subsequence(&[0, 1, 2]), vec![true; 3]);
        assert!(longest_increasing_subsequence(&[]).is_empty());
    }
}
