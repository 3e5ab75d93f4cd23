//! Kit map: which sample plays on which lane

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lane name -> sample reference (path or URI). One sample per lane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KitMap {
    samples: BTreeMap<String, String>,
}

impl KitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a sample to a lane, replacing any previous one.
    pub fn set(&mut self, lane: impl Into<String>, sample: impl Into<String>) {
        self.samples.insert(lane.into(), sample.into());
    }

    pub fn with(mut self, lane: impl Into<String>, sample: impl Into<String>) -> Self {
        self.set(lane, sample);
        self
    }

    pub fn remove(&mut self, lane: &str) -> Option<String> {
        self.samples.remove(lane)
    }

    pub fn sample(&self, lane: &str) -> Option<&str> {
        self.samples.get(lane).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.samples.iter().map(|(lane, uri)| (lane.as_str(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<L: Into<String>, S: Into<String>> FromIterator<(L, S)> for KitMap {
    fn from_iter<I: IntoIterator<Item = (L, S)>>(iter: I) -> Self {
        let samples = iter.into_iter().map(|(l, s)| (l.into(), s.into())).collect();
        Self { samples }
    }
}
