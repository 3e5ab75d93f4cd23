//! Playback engine: schedules lane triggers against the transport clock

use std::collections::HashMap;

use beatgrid_core::{KitMap, Note, NoteStore, TransportClock};
use tracing::{debug, info, warn};

use crate::backend::{db_to_gain, velocity_to_db, AudioBackend, MeterLevels, PlayerId, TriggerId};

/// A start handed to the backend that may not have sounded yet
#[derive(Debug, Clone)]
struct PendingTrigger {
    id: TriggerId,
    /// Absolute start on the backend clock
    start_at: f64,
}

/// Owns one player per kit lane and turns notes into scheduled starts.
///
/// The engine is built from a [`KitMap`] and never patched: to change the
/// kit, call [`PlaybackEngine::rebuild`] (or construct a new engine).
pub struct PlaybackEngine<B: AudioBackend> {
    backend: B,
    kit: KitMap,
    players: HashMap<String, PlayerId>,
    pending: Vec<PendingTrigger>,
    master_gain_db: f32,
}

impl<B: AudioBackend> PlaybackEngine<B> {
    /// Load a player for every lane in `kit`. Lanes whose sample fails to
    /// load are logged and left silent.
    pub fn new(mut backend: B, kit: KitMap) -> Self {
        backend.clear_players();

        let mut players = HashMap::new();
        for (lane, uri) in kit.iter() {
            match backend.create_player(lane, uri) {
                Ok(player) => {
                    players.insert(lane.to_string(), player);
                }
                Err(e) => warn!(lane, uri, "Sample unavailable, lane will be silent: {}", e),
            }
        }

        info!(lanes = players.len(), configured = kit.len(), "Playback engine ready");
        Self {
            backend,
            kit,
            players,
            pending: Vec::new(),
            master_gain_db: 0.0,
        }
    }

    /// Tear down and rebuild every player from a new kit.
    pub fn rebuild(mut self, kit: KitMap) -> Self {
        self.stop();
        let master_gain_db = self.master_gain_db;
        let mut engine = Self::new(self.backend, kit);
        engine.set_master_gain_db(master_gain_db);
        engine
    }

    /// Schedule `lane` to sound at transport time `target_time`.
    ///
    /// `velocity` is normalized (0.0..=1.0). Lanes without a player are a
    /// silent no-op and return `None`.
    pub fn trigger(
        &mut self,
        lane: &str,
        target_time: f64,
        velocity: f32,
        clock: &impl TransportClock,
    ) -> Option<TriggerId> {
        self.prune_pending();

        let player = *self.players.get(lane)?;
        let delay = (target_time - clock.current_time()).max(0.0);
        let gain_db = velocity_to_db(velocity);

        match self.backend.start_player(player, delay, gain_db) {
            Ok(id) => {
                let start_at = self.backend.now() + delay;
                self.pending.push(PendingTrigger { id, start_at });
                Some(id)
            }
            Err(e) => {
                warn!(lane, "Trigger dropped: {}", e);
                None
            }
        }
    }

    /// Trigger a note on its own lane at its own time.
    pub fn trigger_note(&mut self, note: &Note, clock: &impl TransportClock) -> Option<TriggerId> {
        self.trigger(&note.lane, note.time, note.velocity_normalized(), clock)
    }

    /// Trigger every note with `from <= time < to`, earliest first.
    ///
    /// Meant to be called once per lookahead window by the host clock.
    /// Returns the number of triggers scheduled.
    pub fn schedule_window(
        &mut self,
        store: &NoteStore,
        from: f64,
        to: f64,
        clock: &impl TransportClock,
    ) -> usize {
        let mut due: Vec<&Note> = store
            .iter()
            .filter(|n| n.time >= from && n.time < to)
            .collect();
        due.sort_by(|a, b| a.time.total_cmp(&b.time));

        let scheduled = due
            .into_iter()
            .filter_map(|note| self.trigger_note(note, clock))
            .count();
        debug!(from, to, scheduled, "Scheduled window");
        scheduled
    }

    /// Cancel every pending trigger and reset the meters.
    pub fn stop(&mut self) {
        let cancelled = self.pending.len();
        for trigger in self.pending.drain(..) {
            self.backend.cancel(trigger.id);
        }
        self.backend.reset_meters();
        info!(cancelled, "Playback stopped");
    }

    pub fn levels(&self) -> MeterLevels {
        self.backend.levels()
    }

    pub fn waveform(&self) -> Vec<f32> {
        self.backend.waveform()
    }

    pub fn set_master_gain_db(&mut self, db: f32) {
        self.master_gain_db = db;
        self.backend.set_master_gain(db_to_gain(db));
    }

    pub fn master_gain_db(&self) -> f32 {
        self.master_gain_db
    }

    /// Number of triggers that have not started yet (as of the last prune).
    pub fn pending_triggers(&self) -> usize {
        self.pending.len()
    }

    pub fn has_lane(&self, lane: &str) -> bool {
        self.players.contains_key(lane)
    }

    pub fn kit(&self) -> &KitMap {
        &self.kit
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Drop triggers the backend clock has moved past. A start at exactly
    /// `now` has not been rendered yet and stays cancellable.
    fn prune_pending(&mut self) {
        let now = self.backend.now();
        self.pending.retain(|t| t.start_at >= now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use beatgrid_core::Transport;

    #[derive(Debug, Clone, PartialEq)]
    struct Start {
        player: PlayerId,
        delay: f64,
        gain_db: f32,
    }

    /// Records calls instead of making sound
    #[derive(Default)]
    struct FakeBackend {
        now: f64,
        players: Vec<String>,
        starts: Vec<Start>,
        cancelled: Vec<TriggerId>,
        master_gain: f32,
        meter_resets: usize,
    }

    impl AudioBackend for FakeBackend {
        fn create_player(&mut self, lane: &str, uri: &str) -> Result<PlayerId, BackendError> {
            if uri.starts_with("missing") {
                return Err(BackendError::SampleLoad {
                    uri: uri.into(),
                    reason: "not found".into(),
                });
            }
            self.players.push(lane.to_string());
            Ok(PlayerId(self.players.len() as u64 - 1))
        }

        fn clear_players(&mut self) {
            self.players.clear();
        }

        fn start_player(
            &mut self,
            player: PlayerId,
            delay: f64,
            gain_db: f32,
        ) -> Result<TriggerId, BackendError> {
            self.starts.push(Start { player, delay, gain_db });
            Ok(TriggerId(self.starts.len() as u64 - 1))
        }

        fn cancel(&mut self, trigger: TriggerId) {
            self.cancelled.push(trigger);
        }

        fn now(&self) -> f64 {
            self.now
        }

        fn set_master_gain(&mut self, gain: f32) {
            self.master_gain = gain;
        }

        fn levels(&self) -> MeterLevels {
            MeterLevels { peak: 0.5, rms: 0.25 }
        }

        fn waveform(&self) -> Vec<f32> {
            vec![0.0, 0.5, -0.5]
        }

        fn reset_meters(&mut self) {
            self.meter_resets += 1;
        }
    }

    fn kit() -> KitMap {
        KitMap::new()
            .with("kick", "kick.wav")
            .with("snare", "snare.wav")
            .with("tom", "missing-tom.wav")
    }

    fn clock_at(secs: f64) -> Transport {
        let mut transport = Transport::new(1000);
        transport.set_position_secs(secs);
        transport
    }

    #[test]
    fn test_missing_lane_is_silent() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        assert!(engine.trigger("cowbell", 1.0, 1.0, &0.0).is_none());
        // sample failed to load
        assert!(!engine.has_lane("tom"));
        assert!(engine.trigger("tom", 1.0, 1.0, &0.0).is_none());
        assert!(engine.backend().starts.is_empty());
    }

    #[test]
    fn test_delay_relative_to_transport() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        engine.trigger("snare", 2.5, 1.0, &clock_at(2.0)).unwrap();
        // target already passed -> start immediately
        engine.trigger("kick", 1.0, 0.5, &clock_at(2.0)).unwrap();

        let starts = &engine.backend().starts;
        assert!((starts[0].delay - 0.5).abs() < 1e-9);
        assert_eq!(starts[0].gain_db, 0.0);
        assert_eq!(starts[1].delay, 0.0);
        assert!((starts[1].gain_db - velocity_to_db(0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_trigger_note_maps_velocity() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        engine.trigger_note(&Note::new("kick", 0.0, 127), &0.0).unwrap();
        assert_eq!(engine.backend().starts[0].gain_db, 0.0);
    }

    #[test]
    fn test_schedule_window_orders_by_time() {
        let store = NoteStore::from_notes([
            Note::new("snare", 0.75, 100),
            Note::new("kick", 0.5, 100),
            Note::new("kick", 0.0, 100),
            Note::new("kick", 1.0, 100),
            Note::new("tom", 0.6, 100),
        ]);
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());

        let scheduled = engine.schedule_window(&store, 0.25, 1.0, &0.0);
        assert_eq!(scheduled, 2);
        let delays: Vec<f64> = engine.backend().starts.iter().map(|s| s.delay).collect();
        assert_eq!(delays, vec![0.5, 0.75]);
    }

    #[test]
    fn test_stop_cancels_pending() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        let a = engine.trigger("kick", 1.0, 1.0, &0.0).unwrap();
        let b = engine.trigger("snare", 2.0, 1.0, &0.0).unwrap();
        assert_eq!(engine.pending_triggers(), 2);

        engine.stop();
        assert_eq!(engine.pending_triggers(), 0);
        assert_eq!(engine.backend().cancelled, vec![a, b]);
        assert_eq!(engine.backend().meter_resets, 1);
    }

    #[test]
    fn test_started_triggers_are_pruned() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        engine.trigger("kick", 1.0, 1.0, &0.0).unwrap();
        engine.trigger("kick", 3.0, 1.0, &0.0).unwrap();

        engine.backend_mut().now = 2.0;
        engine.trigger("snare", 4.0, 1.0, &2.0).unwrap();
        assert_eq!(engine.pending_triggers(), 2);
    }

    #[test]
    fn test_immediate_trigger_stays_cancellable() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        let kick = engine.trigger("kick", 0.0, 1.0, &0.0).unwrap();
        let snare = engine.trigger("snare", 0.0, 1.0, &0.0).unwrap();
        assert_eq!(engine.pending_triggers(), 2);

        engine.stop();
        assert_eq!(engine.backend().cancelled, vec![kick, snare]);
    }

    #[test]
    fn test_rebuild_replaces_players() {
        let engine = PlaybackEngine::new(FakeBackend::default(), kit());
        let mut engine = engine.rebuild(KitMap::new().with("clap", "clap.wav"));

        assert!(engine.has_lane("clap"));
        assert!(!engine.has_lane("kick"));
        assert_eq!(engine.backend().players, vec!["clap".to_string()]);
        assert!(engine.trigger("kick", 0.0, 1.0, &0.0).is_none());
    }

    #[test]
    fn test_introspection_and_master_gain() {
        let mut engine = PlaybackEngine::new(FakeBackend::default(), kit());
        assert_eq!(engine.levels(), MeterLevels { peak: 0.5, rms: 0.25 });
        assert_eq!(engine.waveform().len(), 3);

        engine.set_master_gain_db(-6.0);
        assert!((engine.backend().master_gain - 0.501187).abs() < 1e-4);
    }
}
