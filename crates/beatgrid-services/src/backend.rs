//! Audio backend contract the playback engine drives

use thiserror::Error;

use crate::audio_io::AudioOutputError;

/// Floor for the velocity -> dB mapping (-60 dB)
const MIN_VELOCITY: f32 = 0.001;

/// Handle to a loaded sample player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub u64);

/// Handle to one scheduled start of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(pub u64);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to load sample {uri}: {reason}")]
    SampleLoad { uri: String, reason: String },
    #[error("Resample error: {0}")]
    Resample(String),
    #[error("Unknown player: {0:?}")]
    UnknownPlayer(PlayerId),
    #[error("Trigger queue full")]
    QueueFull,
    #[error("Audio output error: {0}")]
    Output(#[from] AudioOutputError),
}

/// Post-mix master bus level (linear, 0.0..=1.0)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterLevels {
    pub peak: f32,
    pub rms: f32,
}

impl MeterLevels {
    pub fn peak_db(&self) -> f32 {
        gain_to_db(self.peak)
    }

    pub fn rms_db(&self) -> f32 {
        gain_to_db(self.rms)
    }
}

/// Anything that can host one sample player per lane and a master bus.
///
/// Delays passed to [`AudioBackend::start_player`] are relative to the
/// backend's own clock ([`AudioBackend::now`]), not the transport.
pub trait AudioBackend {
    /// Load `uri` as the sample for `lane`.
    fn create_player(&mut self, lane: &str, uri: &str) -> Result<PlayerId, BackendError>;

    /// Drop every player (engine rebuilds call this first).
    fn clear_players(&mut self);

    /// Start `player` after `delay_secs` at `gain_db`.
    fn start_player(
        &mut self,
        player: PlayerId,
        delay_secs: f64,
        gain_db: f32,
    ) -> Result<TriggerId, BackendError>;

    /// Cancel a scheduled start (and silence it if already sounding).
    fn cancel(&mut self, trigger: TriggerId);

    /// Audio clock in seconds
    fn now(&self) -> f64;

    fn set_master_gain(&mut self, gain: f32);

    fn levels(&self) -> MeterLevels;

    /// Most recent master bus samples, oldest first.
    fn waveform(&self) -> Vec<f32>;

    fn reset_meters(&mut self);
}

/// Logarithmic velocity mapping: `20 * log10(max(0.001, velocity))`.
pub fn velocity_to_db(velocity: f32) -> f32 {
    20.0 * velocity.max(MIN_VELOCITY).log10()
}

pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(MIN_VELOCITY).log10()
}
