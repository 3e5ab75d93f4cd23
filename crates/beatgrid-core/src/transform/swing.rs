//! Swing: push off-beat notes later

use crate::error::{check_grid, Result};
use crate::note::NoteStore;

/// Fraction of a grid step added per unit of swing amount.
const SWING_STEP: f64 = 0.1;

/// Shift notes sitting on the off-beat half of each two-step cycle forward
/// by `grid * amount * 0.1`.
pub fn swing(store: &NoteStore, amount: f64, grid: f64) -> Result<NoteStore> {
    check_grid(grid)?;
    let offset = grid * amount * SWING_STEP;

    Ok(store.map_notes(|note| {
        if !is_off_beat(note.time, grid) {
            return note.clone();
        }
        note.with_time(note.time + offset)
    }))
}

/// Phase within the two-step cycle falls in (0.5, 1.5).
fn is_off_beat(time: f64, grid: f64) -> bool {
    let phase = time.rem_euclid(2.0 * grid) / grid;
    phase > 0.5 && phase < 1.5
}
