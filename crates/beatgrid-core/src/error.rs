//! Error types for beatgrid

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeatgridError {
    #[error("Grid size must be a positive number of seconds, got {0}")]
    InvalidGrid(f64),
    #[error("Duration must be non-negative, got {0}")]
    InvalidDuration(f64),
    #[error("Grid of {grid}s yields too many lines over {duration}s")]
    GridTooDense { duration: f64, grid: f64 },
    #[error("Beats per bar must be at least 1")]
    InvalidBeatsPerBar,
    #[error("History size must be at least 1")]
    InvalidHistorySize,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pattern format error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BeatgridError>;

/// Rejects grid sizes that cannot define alignment points.
pub(crate) fn check_grid(grid: f64) -> Result<()> {
    if grid.is_finite() && grid > 0.0 {
        return Ok(());
    }
    Err(BeatgridError::InvalidGrid(grid))
}
