//! Sample-accurate lane mixer rendered on the audio thread

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::meter::MeterState;
use crate::backend::{PlayerId, TriggerId};

/// Control-side requests, drained at the top of each block
#[derive(Debug, Clone, Copy)]
pub(crate) enum MixerCommand {
    Start { trigger: TriggerId, player: PlayerId, at_frame: u64, gain: f32 },
    Cancel(TriggerId),
    SetMasterGain(f32),
}

/// A start waiting for its frame
#[derive(Debug, Clone, Copy)]
struct ScheduledStart {
    trigger: TriggerId,
    player: PlayerId,
    at_frame: u64,
    gain: f32,
}

/// The one sounding voice of a player
#[derive(Debug, Clone, Copy)]
struct Voice {
    trigger: TriggerId,
    position: usize,
    gain: f32,
}

/// Mixes one monophonic voice per player into a mono master bus.
pub struct Mixer {
    samples: Vec<Arc<Vec<f32>>>,
    voices: Vec<Option<Voice>>,
    /// Kept sorted by `at_frame`
    scheduled: Vec<ScheduledStart>,
    commands: Receiver<MixerCommand>,
    frame: u64,
    clock: Arc<AtomicU64>,
    master_gain: f32,
    meter: Arc<MeterState>,
    output: Vec<f32>,
}

impl Mixer {
    pub(crate) fn new(
        commands: Receiver<MixerCommand>,
        clock: Arc<AtomicU64>,
        meter: Arc<MeterState>,
    ) -> Self {
        Self {
            samples: Vec::new(),
            voices: Vec::new(),
            scheduled: Vec::new(),
            commands,
            frame: 0,
            clock,
            master_gain: 1.0,
            meter,
            output: Vec::new(),
        }
    }

    pub(crate) fn add_player(&mut self, data: Vec<f32>) -> PlayerId {
        self.samples.push(Arc::new(data));
        self.voices.push(None);
        PlayerId(self.samples.len() as u64 - 1)
    }

    /// Queued starts refer to the old players, so they are applied (and
    /// discarded) before the player slots are reused.
    pub(crate) fn clear_players(&mut self) {
        self.drain_commands();
        self.samples.clear();
        self.voices.clear();
        self.scheduled.clear();
    }

    pub(crate) fn has_player(&self, player: PlayerId) -> bool {
        (player.0 as usize) < self.samples.len()
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    pub fn scheduled_starts(&self) -> usize {
        self.scheduled.len()
    }

    pub(crate) fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                MixerCommand::Start { trigger, player, at_frame, gain } => {
                    if !self.has_player(player) {
                        continue;
                    }
                    let idx = self.scheduled.partition_point(|s| s.at_frame <= at_frame);
                    self.scheduled.insert(idx, ScheduledStart { trigger, player, at_frame, gain });
                }
                MixerCommand::Cancel(trigger) => {
                    self.scheduled.retain(|s| s.trigger != trigger);
                    for voice in &mut self.voices {
                        if voice.is_some_and(|v| v.trigger == trigger) {
                            *voice = None;
                        }
                    }
                }
                MixerCommand::SetMasterGain(gain) => self.master_gain = gain,
            }
        }
    }

    /// Render `num_frames` of mono master output and advance the clock.
    pub fn render(&mut self, num_frames: usize) -> &[f32] {
        self.drain_commands();

        self.output.clear();
        self.output.resize(num_frames, 0.0);
        let mut clipped = false;

        for frame_idx in 0..num_frames {
            let now = self.frame + frame_idx as u64;

            // Monophonic per player: a new start replaces the sounding voice
            while let Some(start) = self.scheduled.first().copied() {
                if start.at_frame > now {
                    break;
                }
                self.scheduled.remove(0);
                self.voices[start.player.0 as usize] = Some(Voice {
                    trigger: start.trigger,
                    position: 0,
                    gain: start.gain,
                });
            }

            let mut mix = 0.0_f32;
            for (slot, data) in self.voices.iter_mut().zip(&self.samples) {
                let Some(voice) = slot else { continue };
                let Some(&sample) = data.get(voice.position) else {
                    *slot = None;
                    continue;
                };
                mix += sample * voice.gain;
                voice.position += 1;
            }

            let out = mix * self.master_gain;
            clipped |= out.abs() > 1.0;
            self.output[frame_idx] = out.clamp(-1.0, 1.0);
        }

        self.frame += num_frames as u64;
        self.clock.store(self.frame, Ordering::Release);
        self.meter.process_block(&self.output, clipped);
        &self.output
    }

    /// Render into an interleaved device buffer, copying mono to every channel.
    pub fn render_interleaved(&mut self, buffer: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = buffer.len() / channels;
        let mono = self.render(frames);
        for (frame, &sample) in buffer.chunks_exact_mut(channels).zip(mono) {
            frame.fill(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Sender};

    fn mixer() -> (Mixer, Sender<MixerCommand>) {
        let (tx, rx) = unbounded();
        let mixer = Mixer::new(rx, Arc::new(AtomicU64::new(0)), Arc::new(MeterState::new()));
        (mixer, tx)
    }

    fn start(trigger: u64, player: PlayerId, at_frame: u64, gain: f32) -> MixerCommand {
        MixerCommand::Start { trigger: TriggerId(trigger), player, at_frame, gain }
    }

    #[test]
    fn test_start_is_sample_accurate() {
        let (mut mixer, tx) = mixer();
        let kick = mixer.add_player(vec![1.0, 0.5]);
        tx.send(start(0, kick, 3, 0.5)).unwrap();

        let out = mixer.render(6).to_vec();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.5, 0.25, 0.0]);
        assert_eq!(mixer.frame(), 6);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_retrigger_restarts_voice() {
        let (mut mixer, tx) = mixer();
        let snare = mixer.add_player(vec![0.1, 0.2, 0.3, 0.4]);
        tx.send(start(0, snare, 0, 1.0)).unwrap();
        tx.send(start(1, snare, 2, 1.0)).unwrap();

        let out = mixer.render(5).to_vec();
        assert_eq!(out, vec![0.1, 0.2, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_lanes_sum_and_clip() {
        let (mut mixer, tx) = mixer();
        let a = mixer.add_player(vec![0.75; 2]);
        let b = mixer.add_player(vec![0.75; 2]);
        tx.send(start(0, a, 0, 1.0)).unwrap();
        tx.send(start(1, b, 0, 1.0)).unwrap();

        let out = mixer.render(2).to_vec();
        assert_eq!(out, vec![1.0, 1.0]);
        assert!(mixer.meter.is_clipped());
        assert_eq!(mixer.meter.peak(), 1.0);
    }

    #[test]
    fn test_cancel_removes_pending_and_sounding() {
        let (mut mixer, tx) = mixer();
        let hat = mixer.add_player(vec![0.5; 8]);
        tx.send(start(0, hat, 0, 1.0)).unwrap();
        tx.send(start(1, hat, 100, 1.0)).unwrap();
        mixer.render(2);
        assert_eq!(mixer.active_voices(), 1);
        assert_eq!(mixer.scheduled_starts(), 1);

        tx.send(MixerCommand::Cancel(TriggerId(0))).unwrap();
        tx.send(MixerCommand::Cancel(TriggerId(1))).unwrap();
        let out = mixer.render(2).to_vec();
        assert_eq!(out, vec![0.0, 0.0]);
        assert_eq!(mixer.scheduled_starts(), 0);
    }

    #[test]
    fn test_master_gain_and_clock() {
        let (mut mixer, tx) = mixer();
        let clock = mixer.clock.clone();
        let kick = mixer.add_player(vec![0.8]);
        tx.send(MixerCommand::SetMasterGain(0.5)).unwrap();
        tx.send(start(0, kick, 0, 1.0)).unwrap();

        assert_eq!(mixer.render(4)[0], 0.4);
        assert_eq!(clock.load(Ordering::Acquire), 4);
    }

    #[test]
    fn test_clear_players_discards_queued_starts() {
        let (mut mixer, tx) = mixer();
        let kick = mixer.add_player(vec![1.0]);
        tx.send(start(0, kick, 0, 1.0)).unwrap();

        mixer.clear_players();
        mixer.add_player(vec![0.125]);
        assert_eq!(mixer.render(2).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_unknown_player_ignored() {
        let (mut mixer, tx) = mixer();
        tx.send(start(0, PlayerId(9), 0, 1.0)).unwrap();
        mixer.render(1);
        assert_eq!(mixer.scheduled_starts(), 0);
    }

    #[test]
    fn test_interleaved_copies_channels() {
        let (mut mixer, tx) = mixer();
        let kick = mixer.add_player(vec![0.5, 0.25]);
        tx.send(start(0, kick, 0, 1.0)).unwrap();

        let mut buffer = [0.0_f32; 4];
        mixer.render_interleaved(&mut buffer, 2);
        assert_eq!(buffer, [0.5, 0.5, 0.25, 0.25]);
    }
}
