//! Time-range selection, deletion and moves

use serde::{Deserialize, Serialize};

use crate::note::{Note, NoteStore};

/// Which lanes a range edit applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSelection {
    #[default]
    All,
    Lanes(Vec<String>),
}

impl LaneSelection {
    pub fn only<I, S>(lanes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Lanes(lanes.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, lane: &str) -> bool {
        match self {
            Self::All => true,
            Self::Lanes(lanes) => lanes.iter().any(|l| l == lane),
        }
    }
}

/// Inclusive `[start, end]`; reversed bounds are swapped.
#[derive(Debug, Clone, Copy)]
struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    fn new(start: f64, end: f64) -> Self {
        if start > end {
            return Self { start: end, end: start };
        }
        Self { start, end }
    }

    fn contains(&self, note: &Note) -> bool {
        self.start <= note.time && note.time <= self.end
    }
}

/// Notes with `start <= time <= end` from each selected lane.
///
/// Only selected lanes appear in the result; a selected lane with nothing in
/// range is present but empty.
pub fn select_range(store: &NoteStore, start: f64, end: f64, lanes: &LaneSelection) -> NoteStore {
    let range = TimeRange::new(start, end);
    let mut selected = NoteStore::new();

    for (name, notes) in store.lanes().filter(|(name, _)| lanes.contains(name)) {
        let hits = notes.iter().filter(|n| range.contains(n)).cloned().collect();
        selected.set_lane(name, hits);
    }
    selected
}

/// Drop in-range notes from selected lanes; everything else passes through.
pub fn delete_range(store: &NoteStore, start: f64, end: f64, lanes: &LaneSelection) -> NoteStore {
    let range = TimeRange::new(start, end);
    store.map_lanes(|name, notes| {
        if !lanes.contains(name) {
            return notes.to_vec();
        }
        notes.iter().filter(|n| !range.contains(n)).cloned().collect()
    })
}

/// Shift in-range notes of selected lanes by `offset` seconds (clamped at 0).
pub fn move_range(
    store: &NoteStore,
    start: f64,
    end: f64,
    offset: f64,
    lanes: &LaneSelection,
) -> NoteStore {
    let range = TimeRange::new(start, end);
    store.map_lanes(|name, notes| {
        if !lanes.contains(name) {
            return notes.to_vec();
        }
        notes
            .iter()
            .map(|n| if range.contains(n) { n.with_time(n.time + offset) } else { n.clone() })
            .collect()
    })
}
