//! beatgrid-core: Drum pattern data model, transforms and edit history

mod error;
pub mod history;
mod kit;
mod note;
mod session;
pub mod transform;
mod transport;

pub use error::{BeatgridError, Result};
pub use history::{HistoryEntry, HistoryManager, DEFAULT_MAX_HISTORY};
pub use kit::KitMap;
pub use note::{Note, NoteStore, MAX_VELOCITY};
pub use session::EditSession;
pub use transform::{
    delete_range, grid_lines, humanize, move_range, quantize, select_range, snap_time, swing,
    ChainStep, GridLine, GridLineKind, GridLines, LaneSelection, NoteTransform, RandomSource,
    TransformChain,
};
pub use transport::{Transport, TransportClock, TransportState};
