//! beatgrid-services: Playback engine and audio backends

pub mod audio_io;
pub mod backend;
pub mod native;
pub mod playback;

pub use audio_io::{default_output_info, AudioOutputError, RealtimeOutputStream};
pub use backend::{
    db_to_gain, gain_to_db, velocity_to_db, AudioBackend, BackendError, MeterLevels, PlayerId,
    TriggerId,
};
pub use native::{MeterState, Mixer, NativeBackend};
pub use playback::PlaybackEngine;
