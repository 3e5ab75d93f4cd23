//! Master bus metering and waveform tap

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::backend::MeterLevels;

/// Samples kept for waveform display
pub const WAVEFORM_SIZE: usize = 1024;

/// Shared master bus analysis (lock-free level reads)
pub struct MeterState {
    peak_raw: AtomicU32,
    rms_raw: AtomicU32,
    clipped: AtomicBool,
    waveform: Mutex<WaveformRing>,
}

struct WaveformRing {
    samples: Vec<f32>,
    write_pos: usize,
}

impl MeterState {
    pub fn new() -> Self {
        Self {
            peak_raw: AtomicU32::new(0),
            rms_raw: AtomicU32::new(0),
            clipped: AtomicBool::new(false),
            waveform: Mutex::new(WaveformRing {
                samples: vec![0.0; WAVEFORM_SIZE],
                write_pos: 0,
            }),
        }
    }

    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_raw.load(Ordering::Relaxed))
    }

    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_raw.load(Ordering::Relaxed))
    }

    pub fn levels(&self) -> MeterLevels {
        MeterLevels { peak: self.peak(), rms: self.rms() }
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped.load(Ordering::Relaxed)
    }

    pub fn clear_clip(&self) {
        self.clipped.store(false, Ordering::Relaxed);
    }

    /// Waveform snapshot, oldest sample first
    pub fn waveform(&self) -> Vec<f32> {
        let Ok(ring) = self.waveform.lock() else {
            return vec![0.0; WAVEFORM_SIZE];
        };
        let (newer, older) = ring.samples.split_at(ring.write_pos);
        older.iter().chain(newer).copied().collect()
    }

    /// Zero levels, clip flag and waveform.
    pub fn reset(&self) {
        self.peak_raw.store(0.0_f32.to_bits(), Ordering::Relaxed);
        self.rms_raw.store(0.0_f32.to_bits(), Ordering::Relaxed);
        self.clear_clip();
        if let Ok(mut ring) = self.waveform.lock() {
            ring.samples.fill(0.0);
            ring.write_pos = 0;
        }
    }

    /// Update from one rendered block (pre-clip values flag clipping).
    pub(crate) fn process_block(&self, block: &[f32], clipped: bool) {
        if block.is_empty() {
            return;
        }

        let peak = block.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let rms = (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt();
        self.peak_raw.store(peak.to_bits(), Ordering::Relaxed);
        self.rms_raw.store(rms.to_bits(), Ordering::Relaxed);
        if clipped {
            self.clipped.store(true, Ordering::Relaxed);
        }

        let Ok(mut ring) = self.waveform.lock() else { return };
        for &sample in block {
            let pos = ring.write_pos;
            ring.samples[pos] = sample;
            ring.write_pos = (pos + 1) % WAVEFORM_SIZE;
        }
    }
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_levels() {
        let meter = MeterState::new();
        meter.process_block(&[0.5, -1.0, 0.5, 0.0], false);
        assert_eq!(meter.peak(), 1.0);
        assert!((meter.rms() - (1.5_f32 / 4.0).sqrt()).abs() < 1e-6);
        assert!(!meter.is_clipped());
    }

    #[test]
    fn test_waveform_order() {
        let meter = MeterState::new();
        let block: Vec<f32> = (0..WAVEFORM_SIZE + 2).map(|i| i as f32).collect();
        meter.process_block(&block, false);

        let wave = meter.waveform();
        assert_eq!(wave.len(), WAVEFORM_SIZE);
        assert_eq!(wave[0], 2.0);
        assert_eq!(wave[WAVEFORM_SIZE - 1], (WAVEFORM_SIZE + 1) as f32);
    }

    #[test]
    fn test_reset() {
        let meter = MeterState::new();
        meter.process_block(&[0.9; 16], true);
        assert!(meter.is_clipped());

        meter.reset();
        assert_eq!(meter.levels(), MeterLevels::default());
        assert!(!meter.is_clipped());
        assert!(meter.waveform().iter().all(|&s| s == 0.0));
    }
}
