//! In-process audio backend: WAV samples, lane mixer, metering, cpal output

mod meter;
mod mixer;
mod sample;

pub use meter::{MeterState, WAVEFORM_SIZE};
pub use mixer::Mixer;
pub use sample::{load_sample, resample, sample_path, write_wav};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::audio_io::RealtimeOutputStream;
use crate::backend::{AudioBackend, BackendError, MeterLevels, PlayerId, TriggerId};
use mixer::MixerCommand;

/// Capacity of the control -> audio thread queue
const COMMAND_QUEUE_SIZE: usize = 1024;

/// Block size used for offline rendering
const OFFLINE_BLOCK: usize = 512;

/// Native backend: owns the mixer and optionally a device stream driving it.
pub struct NativeBackend {
    sample_rate: u32,
    mixer: Arc<Mutex<Mixer>>,
    commands: Sender<MixerCommand>,
    clock: Arc<AtomicU64>,
    meter: Arc<MeterState>,
    next_trigger: u64,
    stream: Option<RealtimeOutputStream>,
}

impl NativeBackend {
    pub fn new(sample_rate: u32) -> Self {
        let (commands, rx) = bounded(COMMAND_QUEUE_SIZE);
        let clock = Arc::new(AtomicU64::new(0));
        let meter = Arc::new(MeterState::new());
        let mixer = Mixer::new(rx, clock.clone(), meter.clone());

        Self {
            sample_rate,
            mixer: Arc::new(Mutex::new(mixer)),
            commands,
            clock,
            meter,
            next_trigger: 0,
            stream: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn meter_state(&self) -> Arc<MeterState> {
        self.meter.clone()
    }

    /// Register already-decoded mono audio as a player.
    pub fn add_player_samples(&mut self, samples: Vec<f32>) -> PlayerId {
        self.lock_mixer().add_player(samples)
    }

    /// Drive the mixer from the default output device.
    ///
    /// The device must run at this backend's sample rate; use
    /// [`crate::audio_io::default_output_info`] to pick it.
    pub fn start_output(&mut self) -> Result<(), BackendError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mixer = self.mixer.clone();
        let stream = RealtimeOutputStream::start(move |buffer, _sample_rate, channels| {
            let Ok(mut mixer) = mixer.lock() else {
                buffer.fill(0.0);
                return;
            };
            mixer.render_interleaved(buffer, channels as usize);
        })?;

        if stream.sample_rate() != self.sample_rate {
            warn!(
                device_rate = stream.sample_rate(),
                engine_rate = self.sample_rate,
                "Device sample rate differs from engine rate; timing will drift"
            );
        }
        self.stream = Some(stream);
        info!("Native backend output started");
        Ok(())
    }

    pub fn stop_output(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
            info!("Native backend output stopped");
        }
    }

    pub fn is_output_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Render `seconds` of audio without a device (mono master bus).
    pub fn render_offline(&mut self, seconds: f64) -> Vec<f32> {
        let total = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;
        let mut out = Vec::with_capacity(total);
        let mut mixer = self.lock_mixer();
        while out.len() < total {
            let block = OFFLINE_BLOCK.min(total - out.len());
            out.extend_from_slice(mixer.render(block));
        }
        out
    }

    fn lock_mixer(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a command for the mixer. When the queue is full (scheduling
    /// far ahead of rendering) the backlog is applied on this thread first.
    fn send(&self, command: MixerCommand) -> Result<(), BackendError> {
        let command = match self.commands.try_send(command) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Disconnected(_)) => return Err(BackendError::QueueFull),
            Err(TrySendError::Full(command)) => command,
        };
        self.lock_mixer().drain_commands();
        self.commands.try_send(command).map_err(|_| BackendError::QueueFull)
    }
}

impl AudioBackend for NativeBackend {
    fn create_player(&mut self, lane: &str, uri: &str) -> Result<PlayerId, BackendError> {
        let samples = load_sample(uri, self.sample_rate)?;
        let frames = samples.len();
        let player = self.add_player_samples(samples);
        debug!(lane, uri, frames, "Loaded sample player");
        Ok(player)
    }

    fn clear_players(&mut self) {
        self.lock_mixer().clear_players();
    }

    fn start_player(
        &mut self,
        player: PlayerId,
        delay_secs: f64,
        gain_db: f32,
    ) -> Result<TriggerId, BackendError> {
        if !self.lock_mixer().has_player(player) {
            return Err(BackendError::UnknownPlayer(player));
        }

        let trigger = TriggerId(self.next_trigger);
        self.next_trigger += 1;

        let delay_frames = (delay_secs.max(0.0) * self.sample_rate as f64).round() as u64;
        let at_frame = self.clock.load(Ordering::Acquire) + delay_frames;
        let gain = 10.0_f32.powf(gain_db / 20.0);

        self.send(MixerCommand::Start { trigger, player, at_frame, gain })?;
        Ok(trigger)
    }

    fn cancel(&mut self, trigger: TriggerId) {
        if self.send(MixerCommand::Cancel(trigger)).is_err() {
            warn!(?trigger, "Cancel dropped, command queue full");
        }
    }

    fn now(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn set_master_gain(&mut self, gain: f32) {
        if self.send(MixerCommand::SetMasterGain(gain)).is_err() {
            warn!(gain, "Master gain change dropped, command queue full");
        }
    }

    fn levels(&self) -> MeterLevels {
        self.meter.levels()
    }

    fn waveform(&self) -> Vec<f32> {
        self.meter.waveform()
    }

    fn reset_meters(&mut self) {
        self.meter.reset();
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        self.stop_output();
    }
}
