//! Core domain types for the habit tracker
//!
//! | Term | Definition |
//! |------|------------|
//! | **Tracker** | A recurring habit with a name, emoji, color, weekly schedule and category |
//! | **Category** | A title that groups trackers; keyed by its trimmed title |
//! | **Completion** | A tracker marked done on one calendar day |
//! | **Weekday mask** | The persisted 7-bit encoding of a schedule |
//!
//! ## Weekday mask encoding
//!
//! The mask is stored in the database, so this mapping is a persisted format
//! and must never change. Weekdays are numbered 1 (Sunday) through
//! 7 (Saturday) and each one owns bit `ordinal - 1`:
//!
//! | Weekday | Ordinal | Bit |
//! |---------|---------|-----|
//! | Sunday | 1 | `0x01` |
//! | Monday | 2 | `0x02` |
//! | Tuesday | 3 | `0x04` |
//! | Wednesday | 4 | `0x08` |
//! | Thursday | 5 | `0x10` |
//! | Friday | 6 | `0x20` |
//! | Saturday | 7 | `0x40` |

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================
// Weekday
// ============================================

/// Day of the week, numbered Sunday = 1 .. Saturday = 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    /// All weekdays in ordinal order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Ordinal in `1..=7`, Sunday first.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Weekday::ordinal`].
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1..=7 => Some(Self::ALL[(ordinal - 1) as usize]),
            _ => None,
        }
    }

    /// The single mask bit for this weekday.
    pub fn bit(self) -> u8 {
        1 << (self.ordinal() - 1)
    }

    /// Inverse of [`Weekday::bit`]. Returns `None` unless exactly one valid bit is set.
    pub fn from_bit(bit: u8) -> Option<Self> {
        if bit.count_ones() != 1 || bit > 0x40 {
            return None;
        }
        Self::from_ordinal(bit.trailing_zeros() as u8 + 1)
    }

    /// Weekday of a calendar date.
    pub fn of(day: NaiveDate) -> Self {
        day.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Sunday => "sunday",
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
        }
    }

    /// Three-letter display label (e.g. "Mon").
    pub fn short_name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == lower || day.as_str()[..3] == lower)
            .ok_or_else(|| format!("unknown weekday: {}", s))
    }
}

// ============================================
// Weekday mask
// ============================================

/// Set of weekdays a tracker recurs on, encoded as described in the module docs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub const EMPTY: WeekdayMask = WeekdayMask(0);
    pub const EVERY_DAY: WeekdayMask = WeekdayMask(0x7F);

    /// Decode a stored mask, rejecting bits outside the seven weekdays.
    pub fn from_bits(bits: i64) -> Result<Self> {
        if !(0..=0x7F).contains(&bits) {
            return Err(Error::InvalidMask(bits));
        }
        Ok(WeekdayMask(bits as u8))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & day.bit() != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= day.bit();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !day.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Scheduled weekdays in ordinal order.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        Weekday::ALL.into_iter().filter(move |day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdayMask {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut mask = WeekdayMask::EMPTY;
        for day in iter {
            mask.insert(day);
        }
        mask
    }
}

impl fmt::Display for WeekdayMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == WeekdayMask::EVERY_DAY {
            return f.write_str("every day");
        }
        if self.is_empty() {
            return f.write_str("never");
        }
        let names: Vec<&str> = self.iter().map(|day| day.short_name()).collect();
        f.write_str(&names.join(", "))
    }
}

// ============================================
// Color
// ============================================

/// RGB color, persisted as a `#RRGGBB` string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Color::from_hex(s).ok_or_else(|| format!("invalid hex color: {}", s))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Color::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {}", hex)))
    }
}

// ============================================
// Tracker
// ============================================

/// A recurring habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    /// Generated once at creation, never reused
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    pub color: Color,
    /// Weekdays the habit recurs on
    pub schedule: WeekdayMask,
    /// Title of the owning category
    pub category: String,
}

impl Tracker {
    /// Whether the tracker is scheduled on the given weekday.
    pub fn is_scheduled_on(&self, day: Weekday) -> bool {
        self.schedule.contains(day)
    }
}

/// Input for creating a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTracker {
    pub name: String,
    pub emoji: String,
    pub color: Color,
    /// Category title; created on demand
    pub category: String,
    pub schedule: WeekdayMask,
}

impl NewTracker {
    /// Build the tracker with a fresh id and normalized text fields.
    pub(crate) fn into_tracker(self) -> Tracker {
        Tracker {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            emoji: self.emoji,
            color: self.color,
            schedule: self.schedule,
            category: normalize_title(&self.category),
        }
    }
}

/// Partial update of a tracker. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<Color>,
    pub schedule: Option<WeekdayMask>,
    pub category: Option<String>,
}

impl TrackerUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.emoji.is_none()
            && self.color.is_none()
            && self.schedule.is_none()
            && self.category.is_none()
    }

    /// Apply the update to a tracker in place.
    pub fn apply_to(&self, tracker: &mut Tracker) {
        if let Some(name) = &self.name {
            tracker.name = name.trim().to_string();
        }
        if let Some(emoji) = &self.emoji {
            tracker.emoji = emoji.clone();
        }
        if let Some(color) = self.color {
            tracker.color = color;
        }
        if let Some(schedule) = self.schedule {
            tracker.schedule = schedule;
        }
        if let Some(category) = &self.category {
            tracker.category = normalize_title(category);
        }
    }
}

// ============================================
// Category
// ============================================

/// A grouping label for trackers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    /// Number of trackers currently in this category
    pub tracker_count: i64,
}

/// Normalize a category title to its lookup key.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_string()
}

// ============================================
// Completion records
// ============================================

/// A tracker marked done on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub tracker_id: Uuid,
    pub day: NaiveDate,
}

impl CompletionRecord {
    pub fn new(tracker_id: Uuid, day: NaiveDate) -> Self {
        Self { tracker_id, day }
    }
}

// ============================================
// Grouped view addressing
// ============================================

/// Position of a row in the grouped tracker view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}
