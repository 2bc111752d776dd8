pub mod history;
pub mod mode;
pub mod model;
pub mod session;
pub mod settings;

pub use history::{UndoRing, UndoSnapshot, UNDO_CAPACITY};
pub use mode::{Mode, PendingOffset};
pub use model::{CurveRun, SketchModel};
pub use session::{
    EntityKind, NearestEntity, Outcome, PanDirection, SketchSession, SolveTicket, StatusReport,
    ZoomDirection,
};
pub use settings::{CanvasSize, EditorSettings, SolvePolicy};
