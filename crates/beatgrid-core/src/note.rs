//! Notes and the per-lane note store

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Highest MIDI velocity.
pub const MAX_VELOCITY: u8 = 127;

/// A single drum hit on a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNote")]
pub struct Note {
    /// Start time in seconds (never negative)
    pub time: f64,
    /// Velocity (0-127)
    pub velocity: u8,
    /// Lane the note belongs to (e.g. "kick")
    pub lane: String,
}

impl Note {
    pub fn new(lane: impl Into<String>, time: f64, velocity: u8) -> Self {
        Self {
            time: clamp_time(time),
            velocity: velocity.min(MAX_VELOCITY),
            lane: lane.into(),
        }
    }

    /// Copy of this note moved to `time`, clamped at zero.
    pub fn with_time(&self, time: f64) -> Self {
        Self {
            time: clamp_time(time),
            ..self.clone()
        }
    }

    /// Velocity mapped to 0.0..=1.0 for the playback layer.
    pub fn velocity_normalized(&self) -> f32 {
        self.velocity.min(MAX_VELOCITY) as f32 / MAX_VELOCITY as f32
    }
}

/// Note as found in a pattern file, before clamping
#[derive(Deserialize)]
struct RawNote {
    time: f64,
    velocity: u64,
    #[serde(default)]
    lane: String,
}

impl From<RawNote> for Note {
    fn from(raw: RawNote) -> Self {
        let velocity = raw.velocity.min(MAX_VELOCITY as u64) as u8;
        Note::new(raw.lane, raw.time, velocity)
    }
}

/// Negative and NaN times collapse to zero.
pub(crate) fn clamp_time(time: f64) -> f64 {
    if time > 0.0 { time } else { 0.0 }
}

/// Lane name -> notes in insertion order.
///
/// Lanes are kept sorted by name so iteration and serialization are
/// deterministic. Notes inside a lane are not time-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NoteStore {
    lanes: BTreeMap<String, Vec<Note>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group notes by their `lane` field, keeping their relative order.
    pub fn from_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut store = Self::new();
        for note in notes {
            store.insert(note);
        }
        store
    }

    /// Append a note to the end of its lane.
    pub fn insert(&mut self, note: Note) {
        self.lanes.entry(note.lane.clone()).or_default().push(note);
    }

    /// Replace a whole lane.
    pub fn set_lane(&mut self, lane: impl Into<String>, notes: Vec<Note>) {
        self.lanes.insert(lane.into(), notes);
    }

    pub fn lane(&self, lane: &str) -> Option<&[Note]> {
        self.lanes.get(lane).map(Vec::as_slice)
    }

    pub fn contains_lane(&self, lane: &str) -> bool {
        self.lanes.contains_key(lane)
    }

    pub fn lanes(&self) -> impl Iterator<Item = (&str, &[Note])> {
        self.lanes.iter().map(|(name, notes)| (name.as_str(), notes.as_slice()))
    }

    pub fn lane_names(&self) -> impl Iterator<Item = &str> {
        self.lanes.keys().map(String::as_str)
    }

    /// All notes, lane by lane.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.lanes.values().flatten()
    }

    /// Total number of notes across lanes
    pub fn len(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Time of the latest note, 0.0 for an empty store.
    pub fn end_time(&self) -> f64 {
        self.iter().map(|n| n.time).fold(0.0, f64::max)
    }

    /// Build a new store by mapping every lane through `f`.
    pub(crate) fn map_lanes<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &[Note]) -> Vec<Note>,
    {
        let lanes = self
            .lanes
            .iter()
            .map(|(name, notes)| (name.clone(), f(name, notes)))
            .collect();
        Self { lanes }
    }

    /// Build a new store by mapping every note through `f`.
    pub(crate) fn map_notes<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Note) -> Note,
    {
        self.map_lanes(|_, notes| notes.iter().map(&mut f).collect())
    }

    /// Read a pattern file (JSON object of lane -> notes).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the store as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// The map key owns the lane: a note's own `lane` field is overwritten.
impl<'de> Deserialize<'de> for NoteStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut lanes = BTreeMap::<String, Vec<Note>>::deserialize(deserializer)?;
        for (name, notes) in &mut lanes {
            for note in notes {
                note.lane.clone_from(name);
            }
        }
        Ok(Self { lanes })
    }
}

impl FromIterator<Note> for NoteStore {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        Self::from_notes(iter)
    }
}
