//! Non-destructive note transforms
//!
//! Every transform takes a `&NoteStore` and returns a new store. Inputs are
//! never mutated, so results can be pushed straight into history.

mod grid;
mod humanize;
mod quantize;
mod range;
mod swing;

pub use grid::{grid_lines, snap_time, GridLine, GridLineKind, GridLines};
pub use humanize::{humanize, RandomSource};
pub use quantize::quantize;
pub use range::{delete_range, move_range, select_range, LaneSelection};
pub use swing::swing;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::note::NoteStore;

/// Seed used when a chain is built without an explicit one.
pub const DEFAULT_SEED: u64 = 12345;

/// A single parameterised edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteTransform {
    Quantize { strength: f64, grid: f64 },
    Swing { amount: f64, grid: f64 },
    Humanize { amount: f64, timing_variation: f64, velocity_variation: f64 },
    MoveRange {
        start: f64,
        end: f64,
        offset: f64,
        #[serde(default)]
        lanes: LaneSelection,
    },
    DeleteRange {
        start: f64,
        end: f64,
        #[serde(default)]
        lanes: LaneSelection,
    },
}

impl NoteTransform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quantize { .. } => "Quantize",
            Self::Swing { .. } => "Swing",
            Self::Humanize { .. } => "Humanize",
            Self::MoveRange { .. } => "Move",
            Self::DeleteRange { .. } => "Delete",
        }
    }

    /// Apply to `store`. Humanize draws from `rng`; the rest ignore it.
    pub fn apply(&self, store: &NoteStore, rng: &mut impl RandomSource) -> Result<NoteStore> {
        match *self {
            Self::Quantize { strength, grid } => quantize(store, strength, grid),
            Self::Swing { amount, grid } => swing(store, amount, grid),
            Self::Humanize { amount, timing_variation, velocity_variation } => {
                Ok(humanize(store, amount, timing_variation, velocity_variation, rng))
            }
            Self::MoveRange { start, end, offset, ref lanes } => {
                Ok(move_range(store, start, end, offset, lanes))
            }
            Self::DeleteRange { start, end, ref lanes } => {
                Ok(delete_range(store, start, end, lanes))
            }
        }
    }
}

/// One slot in a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub transform: NoteTransform,
    #[serde(default)]
    pub bypass: bool,
}

/// Ordered pipeline of transforms (e.g. quantize -> swing -> humanize)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChain {
    pub steps: Vec<ChainStep>,
    pub bypass_all: bool,
    /// Seed for humanize so the whole pipeline is reproducible
    pub seed: u64,
}

impl Default for TransformChain {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            bypass_all: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed, ..Self::default() }
    }

    pub fn add(&mut self, transform: NoteTransform) {
        self.steps.push(ChainStep { transform, bypass: false });
    }

    pub fn then(mut self, transform: NoteTransform) -> Self {
        self.add(transform);
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<NoteTransform> {
        if index < self.steps.len() {
            return Some(self.steps.remove(index).transform);
        }
        None
    }

    pub fn set_bypass(&mut self, index: usize, bypass: bool) {
        if let Some(step) = self.steps.get_mut(index) {
            step.bypass = bypass;
        }
    }

    /// Run every enabled step in order, each on the previous output.
    pub fn apply(&self, store: &NoteStore) -> Result<NoteStore> {
        let mut current = store.clone();
        if self.bypass_all {
            return Ok(current);
        }

        let mut rng = self.rng();
        for step in self.steps.iter().filter(|s| !s.bypass) {
            current = step.transform.apply(&current, &mut rng)?;
        }
        Ok(current)
    }

    /// Fresh random source seeded from `seed`.
    pub fn rng(&self) -> fastrand::Rng {
        fastrand::Rng::with_seed(self.seed)
    }

    /// Human-readable summary, e.g. "Quantize + Swing".
    pub fn description(&self) -> String {
        let names: Vec<&str> = self
            .steps
            .iter()
            .filter(|s| !s.bypass)
            .map(|s| s.transform.name())
            .collect();
        if names.is_empty() {
            return "No change".to_string();
        }
        names.join(" + ")
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    fn groove() -> NoteStore {
        NoteStore::from_notes([
            Note::new("kick", 0.02, 100),
            Note::new("kick", 0.49, 100),
            Note::new("hihat", 0.26, 70),
            Note::new("hihat", 0.74, 70),
        ])
    }

    #[test]
    fn test_chain_applies_in_order() {
        let chain = TransformChain::new()
            .then(NoteTransform::Quantize { strength: 1.0, grid: 0.25 })
            .then(NoteTransform::Swing { amount: 1.0, grid: 0.25 });

        let out = chain.apply(&groove()).unwrap();
        let hats: Vec<f64> = out.lane("hihat").unwrap().iter().map(|n| n.time).collect();
        // 0.26 -> 0.25 (off-beat, swung by 0.025); 0.74 -> 0.75 (off-beat too)
        assert!((hats[0] - 0.275).abs() < 1e-12);
        assert!((hats[1] - 0.775).abs() < 1e-12);
        assert_eq!(chain.description(), "Quantize + Swing");
    }

    #[test]
    fn test_chain_bypass() {
        let mut chain = TransformChain::new()
            .then(NoteTransform::Quantize { strength: 1.0, grid: 0.25 });
        chain.set_bypass(0, true);
        assert_eq!(chain.apply(&groove()).unwrap(), groove());
        assert_eq!(chain.description(), "No change");

        chain.set_bypass(0, false);
        chain.bypass_all = true;
        assert_eq!(chain.apply(&groove()).unwrap(), groove());
    }

    #[test]
    fn test_chain_propagates_invalid_grid() {
        let chain = TransformChain::new().then(NoteTransform::Swing { amount: 1.0, grid: 0.0 });
        assert!(chain.apply(&groove()).is_err());
    }

    #[test]
    fn test_chain_humanize_is_reproducible() {
        let chain = TransformChain::with_seed(7)
            .then(NoteTransform::Humanize {
                amount: 1.0,
                timing_variation: 0.02,
                velocity_variation: 10.0,
            });
        assert_eq!(chain.apply(&groove()).unwrap(), chain.apply(&groove()).unwrap());
    }

    #[test]
    fn test_chain_serde_shape() {
        let chain = TransformChain::new()
            .then(NoteTransform::DeleteRange { start: 0.0, end: 1.0, lanes: LaneSelection::All });
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json["steps"][0]["transform"]["kind"], "delete_range");
        let back: TransformChain = serde_json::from_value(json).unwrap();
        assert_eq!(back, chain);
    }
}
