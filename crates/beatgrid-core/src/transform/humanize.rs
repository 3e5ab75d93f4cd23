//! Humanize: bounded random jitter on timing and velocity

use crate::note::{clamp_time, NoteStore, MAX_VELOCITY};

/// Source of uniform randomness in `[0, 1)`.
///
/// Injected into [`humanize`] so results are reproducible under a seed.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// Uniform draw from `[-width, +width]`.
    fn jitter(&mut self, width: f64) -> f64 {
        (self.next_unit() * 2.0 - 1.0) * width
    }
}

impl RandomSource for fastrand::Rng {
    fn next_unit(&mut self) -> f64 {
        self.f64()
    }
}

/// Apply independent timing and velocity jitter to every note.
///
/// Timing offsets span `±timing_variation * amount` seconds, velocity offsets
/// `±velocity_variation * amount`. Two draws are taken per note even when the
/// ranges are empty, so a seed maps to the same sequence regardless of
/// amount. Resulting velocity is rounded and clamped to 1..=127. An amount
/// of zero leaves the store untouched.
pub fn humanize(
    store: &NoteStore,
    amount: f64,
    timing_variation: f64,
    velocity_variation: f64,
    rng: &mut impl RandomSource,
) -> NoteStore {
    let time_width = (timing_variation * amount).abs();
    let vel_width = (velocity_variation * amount).abs();

    store.map_notes(|note| {
        let time_offset = rng.jitter(time_width);
        let vel_offset = rng.jitter(vel_width);

        let mut out = note.clone();
        if amount == 0.0 {
            return out;
        }
        out.time = clamp_time(note.time + time_offset);
        let velocity = (note.velocity as f64 + vel_offset).round();
        out.velocity = velocity.clamp(1.0, MAX_VELOCITY as f64) as u8;
        out
    })
}
