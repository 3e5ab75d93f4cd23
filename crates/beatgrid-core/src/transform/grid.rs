//! Grid lines and snapping

use serde::{Deserialize, Serialize};

use crate::error::{check_grid, BeatgridError, Result};
use crate::note::clamp_time;

/// Tolerance for landing on a whole second / the duration end.
const GRID_EPSILON: f64 = 1e-9;

/// How a grid line is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLineKind {
    Bar,
    Beat,
    Subdivision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub time: f64,
    pub kind: GridLineKind,
}

/// Lazy sequence of grid lines over `[0, duration]`.
///
/// Cloning or calling [`GridLines::restart`] replays the sequence from zero.
#[derive(Debug, Clone)]
pub struct GridLines {
    grid_size: f64,
    beats_per_bar: u32,
    count: u64,
    index: u64,
}

impl GridLines {
    pub fn restart(&mut self) {
        self.index = 0;
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    fn classify(&self, index: u64, time: f64) -> GridLineKind {
        // index * grid is a multiple of beats_per_bar * grid exactly when
        // the index is a multiple of beats_per_bar
        if index % self.beats_per_bar as u64 == 0 {
            return GridLineKind::Bar;
        }
        if (time - time.round()).abs() < GRID_EPSILON {
            return GridLineKind::Beat;
        }
        GridLineKind::Subdivision
    }
}

impl Iterator for GridLines {
    type Item = GridLine;

    fn next(&mut self) -> Option<GridLine> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;

        let time = index as f64 * self.grid_size;
        Some(GridLine { time, kind: self.classify(index, time) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridLines {}

/// Grid lines every `grid_size` seconds from 0 up to and including `duration`.
pub fn grid_lines(duration: f64, grid_size: f64, beats_per_bar: u32) -> Result<GridLines> {
    check_grid(grid_size)?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(BeatgridError::InvalidDuration(duration));
    }
    if beats_per_bar == 0 {
        return Err(BeatgridError::InvalidBeatsPerBar);
    }

    let steps = (duration / grid_size + GRID_EPSILON).floor();
    let count = (steps as u64)
        .checked_add(1)
        .filter(|_| steps < u64::MAX as f64)
        .ok_or(BeatgridError::GridTooDense { duration, grid: grid_size })?;
    Ok(GridLines {
        grid_size,
        beats_per_bar,
        count,
        index: 0,
    })
}

/// Nearest multiple of `grid` to `time`, never negative.
pub fn snap_time(time: f64, grid: f64) -> Result<f64> {
    check_grid(grid)?;
    Ok(clamp_time(nearest_grid(time, grid)))
}

pub(super) fn nearest_grid(time: f64, grid: f64) -> f64 {
    (time / grid).round() * grid
}
