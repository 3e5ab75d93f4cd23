//! Quantize: pull notes toward the nearest grid line

use crate::error::{check_grid, Result};
use crate::note::NoteStore;

use super::grid::nearest_grid;

/// Blend each note toward the nearest multiple of `grid` by `strength`
/// (0 = untouched, 1 = exact snap). Strength is clamped to 0..=1.
pub fn quantize(store: &NoteStore, strength: f64, grid: f64) -> Result<NoteStore> {
    check_grid(grid)?;
    let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };

    Ok(store.map_notes(|note| {
        let target = nearest_grid(note.time, grid);
        // Lerp written so both endpoints are exact
        note.with_time(note.time * (1.0 - strength) + target * strength)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    fn loose_kick() -> NoteStore {
        NoteStore::from_notes([
            Note::new("kick", 1.1, 100),
            Note::new("kick", 0.13, 90),
            Note::new("snare", 0.61, 80),
        ])
    }

    #[test]
    fn test_full_strength_snaps_to_nearest() {
        let store = NoteStore::from_notes([Note::new("kick", 1.1, 100)]);
        let out = quantize(&store, 1.0, 0.25).unwrap();
        assert_eq!(out.lane("kick").unwrap()[0].time, 1.0);
    }

    #[test]
    fn test_full_strength_lands_on_grid_multiples() {
        let out = quantize(&loose_kick(), 1.0, 0.25).unwrap();
        let times: Vec<f64> = out.iter().map(|n| n.time).collect();
        assert_eq!(times, vec![1.0, 0.25, 0.5]);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let store = loose_kick();
        assert_eq!(quantize(&store, 0.0, 0.25).unwrap(), store);
    }

    #[test]
    fn test_half_strength_moves_halfway() {
        let store = NoteStore::from_notes([Note::new("kick", 0.2, 100)]);
        let out = quantize(&store, 0.5, 0.25).unwrap();
        assert!((out.lane("kick").unwrap()[0].time - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_input_is_untouched() {
        let store = loose_kick();
        let before = store.clone();
        let _ = quantize(&store, 1.0, 0.5).unwrap();
        assert_eq!(store, before);
    }

    #[test]
    fn test_velocity_and_order_preserved() {
        let out = quantize(&loose_kick(), 1.0, 0.25).unwrap();
        let kick = out.lane("kick").unwrap();
        assert_eq!(kick[0].velocity, 100);
        assert_eq!(kick[1].velocity, 90);
    }

    #[test]
    fn test_rejects_non_positive_grid() {
        assert!(quantize(&loose_kick(), 1.0, 0.0).is_err());
        assert!(quantize(&loose_kick(), 1.0, -0.25).is_err());
        assert!(quantize(&loose_kick(), 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_times_stay_non_negative() {
        let store = NoteStore::from_notes([Note::new("hihat", 0.01, 60)]);
        let out = quantize(&store, 1.0, 1.0).unwrap();
        assert!(out.iter().all(|n| n.time >= 0.0));
    }
}
