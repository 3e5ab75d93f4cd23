//! Transport state and the clock the playback engine reads

use serde::{Deserialize, Serialize};

/// Anything that can report the current transport position in seconds.
///
/// Pulled on demand by the playback engine when it computes trigger delays.
pub trait TransportClock {
    fn current_time(&self) -> f64;
}

/// A fixed position, handy for offline scheduling.
impl TransportClock for f64 {
    fn current_time(&self) -> f64 {
        *self
    }
}

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Transport controls and position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub state: TransportState,
    /// Current position in samples
    pub position_samples: u64,
    /// Sample rate for time conversion
    pub sample_rate: u32,
    /// Tempo in BPM
    pub bpm: f64,
    /// Beats per bar
    pub beats_per_bar: u32,
    pub loop_enabled: bool,
    /// Loop start in samples
    pub loop_start: u64,
    /// Loop end in samples
    pub loop_end: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            position_samples: 0,
            sample_rate: 44100,
            bpm: 120.0,
            beats_per_bar: 4,
            loop_enabled: false,
            loop_start: 0,
            loop_end: 0,
        }
    }
}

impl Transport {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position_samples = 0;
    }

    pub fn pause(&mut self) {
        self.state = TransportState::Paused;
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Position in seconds
    pub fn position_secs(&self) -> f64 {
        self.position_samples as f64 / self.sample_rate as f64
    }

    /// Set position from seconds
    pub fn set_position_secs(&mut self, secs: f64) {
        self.position_samples = (secs.max(0.0) * self.sample_rate as f64) as u64;
    }

    /// Set the loop region in seconds
    pub fn set_loop_secs(&mut self, start: f64, end: f64) {
        self.loop_start = (start.max(0.0) * self.sample_rate as f64) as u64;
        self.loop_end = (end.max(0.0) * self.sample_rate as f64) as u64;
    }

    /// Advance position by given samples, handling loop
    pub fn advance(&mut self, samples: u64) {
        self.position_samples += samples;

        let loop_len = self.loop_end.saturating_sub(self.loop_start);
        if self.loop_enabled && loop_len > 0 && self.position_samples >= self.loop_end {
            let overshoot = (self.position_samples - self.loop_end) % loop_len;
            self.position_samples = self.loop_start + overshoot;
        }
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Length of a 1/`division` note in seconds (4 = quarter, 16 = sixteenth).
    pub fn grid_secs(&self, division: u32) -> f64 {
        self.seconds_per_beat() * 4.0 / division.max(1) as f64
    }

    /// Length of one bar in seconds
    pub fn bar_secs(&self) -> f64 {
        self.seconds_per_beat() * self.beats_per_bar as f64
    }

    /// Format position as MM:SS.ss
    pub fn format_time(&self) -> String {
        let secs = self.position_secs();
        let mins = (secs / 60.0) as u32;
        let secs_rem = secs % 60.0;
        format!("{:02}:{:05.2}", mins, secs_rem)
    }
}

impl TransportClock for Transport {
    fn current_time(&self) -> f64 {
        self.position_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_secs() {
        let transport = Transport::default();
        assert_eq!(transport.seconds_per_beat(), 0.5);
        assert_eq!(transport.grid_secs(4), 0.5);
        assert_eq!(transport.grid_secs(16), 0.125);
        assert_eq!(transport.bar_secs(), 2.0);
    }

    #[test]
    fn test_position_and_clock() {
        let mut transport = Transport::new(48000);
        transport.set_position_secs(1.5);
        assert_eq!(transport.position_samples, 72000);
        assert_eq!(transport.current_time(), 1.5);
        assert_eq!(transport.format_time(), "00:01.50");
    }

    #[test]
    fn test_loop_wraps() {
        let mut transport = Transport::new(1000);
        transport.loop_enabled = true;
        transport.set_loop_secs(1.0, 2.0);
        transport.set_position_secs(1.75);
        transport.advance(300);
        assert_eq!(transport.position_samples, 1050);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut transport = Transport::default();
        transport.play();
        transport.advance(44100);
        assert!(transport.is_playing());
        transport.stop();
        assert_eq!(transport.position_samples, 0);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(2.25_f64.current_time(), 2.25);
    }
}
