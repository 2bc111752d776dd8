//! Sketch editing session
//!
//! Owns the model, the current mode and the undo ring. The host feeds
//! discrete [`EditorCommand`]s through [`SketchSession::apply`]; every
//! command either succeeds with an [`Outcome`] or leaves the session
//! untouched and reports an [`EditorError`].

mod constraint_ops;
mod drawing_ops;
mod solve_ops;
mod view_ops;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use shared::{BeginPoint, Calibration, SegmentKind};
use uuid::Uuid;

use super::history::{UndoRing, UndoSnapshot};
use super::mode::{Mode, PendingOffset};
use super::model::SketchModel;
use super::settings::EditorSettings;
use crate::command::EditorCommand;
use crate::error::{EditorError, EditorResult};
use crate::protocol::RepairHint;
use crate::sketch::to_point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Point,
    Segment,
    Offset,
}

/// Result of a nearest-entity query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestEntity {
    pub kind: EntityKind,
    /// Point, segment or constraint index
    pub index: usize,
    pub label: String,
    pub distance: f64,
}

/// Solve message to be delivered to the solver, tagged with its request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveTicket {
    pub request_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub mode: Mode,
    pub mode_code: u8,
    pub variables: usize,
    pub constraints: usize,
    pub remaining_dof: i64,
    pub solve_pending: bool,
    pub closed: bool,
    pub calibration: Calibration,
    pub line: String,
}

/// What a successful command did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Model or mode changed
    Updated,
    /// Only the screen mapping or the cursor changed
    ViewChanged,
    Nearest(NearestEntity),
    Dump { json: String },
    SolveRequested(SolveTicket),
    Solved,
    RepairSuggested(RepairHint),
    Saved { chunks: Vec<String> },
    Closed,
    Status(StatusReport),
}

/// The in-flight solve request
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PendingSolve {
    pub request_id: Uuid,
    pub point_count: usize,
}

/// Editor session for one sketch
#[derive(Debug, Clone)]
pub struct SketchSession {
    pub(crate) model: SketchModel,
    pub(crate) mode: Mode,
    pub(crate) undo: UndoRing,
    pub(crate) settings: EditorSettings,
    pub(crate) pending_offset: Option<PendingOffset>,
    pub(crate) pending_solve: Option<PendingSolve>,
    pub(crate) repair: Option<RepairHint>,
    pub(crate) branch: String,
    pub(crate) begin: BeginPoint,
    /// Last hovered cursor position
    pub(crate) cursor: Option<Point>,
    /// Monotonically increasing mutation counter
    pub(crate) version: u64,
    pub(crate) closed: bool,
}

impl Default for SketchSession {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl SketchSession {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            model: SketchModel::default(),
            mode: Mode::Initializing,
            undo: UndoRing::default(),
            settings,
            pending_offset: None,
            pending_solve: None,
            repair: None,
            branch: String::new(),
            begin: BeginPoint::default(),
            cursor: None,
            version: 0,
            closed: false,
        }
    }

    /// Session for a host document branch with its begin point
    pub fn with_begin_point(settings: EditorSettings, branch: &str, begin: BeginPoint) -> Self {
        Self {
            branch: branch.to_string(),
            begin,
            ..Self::new(settings)
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn model(&self) -> &SketchModel {
        &self.model
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn begin_point(&self) -> &BeginPoint {
        &self.begin
    }

    pub fn repair_hint(&self) -> Option<&RepairHint> {
        self.repair.as_ref()
    }

    pub fn pending_offset(&self) -> Option<&PendingOffset> {
        self.pending_offset.as_ref()
    }

    pub fn pending_request_id(&self) -> Option<Uuid> {
        self.pending_solve.map(|p| p.request_id)
    }

    pub fn is_solve_pending(&self) -> bool {
        self.pending_solve.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Apply one command.
    pub fn apply(&mut self, command: EditorCommand) -> EditorResult<Outcome> {
        if self.closed {
            return Err(EditorError::SessionClosed);
        }
        tracing::debug!(?command, mode = ?self.mode, "apply");

        let result = self.dispatch(command);
        if let Err(e) = &result {
            tracing::warn!("Command rejected: {e}");
        }
        result
    }

    fn dispatch(&mut self, command: EditorCommand) -> EditorResult<Outcome> {
        // Sub-modes consume the next command (read-only queries and exits excepted)
        if !command.is_passive() && !command.ends_session() {
            if self.mode == Mode::SettingCurvature {
                return self.commit_curvature(command.cursor());
            }
            if self.mode.is_offset_pending() {
                let cursor = command.cursor().or(self.cursor);
                return self.complete_offset(cursor);
            }
        }

        match command {
            EditorCommand::Begin { at } => self.begin(at.map(to_point)),
            EditorCommand::Load { message } => self.load(&message),
            EditorCommand::Hover { at } => self.hover(to_point(at)),
            EditorCommand::Click { .. } => Err(EditorError::WrongMode {
                command: "click",
                mode: self.mode,
            }),
            EditorCommand::AppendLine { at } => self.append(SegmentKind::Line, to_point(at)),
            EditorCommand::AppendArc { at } => self.append(SegmentKind::CircularArc, to_point(at)),
            EditorCommand::AppendSplinePoint { at } => {
                self.append(SegmentKind::SplinePoint, to_point(at))
            }
            EditorCommand::AppendBezierPoint { at } => {
                self.append(SegmentKind::BezierPoint, to_point(at))
            }
            EditorCommand::AppendZeroLength => self.append_zero_length(),
            EditorCommand::CloseSketch => self.close_sketch(),
            EditorCommand::SetConstraint { kind, at, value } => {
                self.set_constraint(kind, to_point(at), value)
            }
            EditorCommand::DeleteConstraint { at, kind } => self.delete_constraint(to_point(at), kind),
            EditorCommand::QueryNearest { at } => {
                self.query_nearest(to_point(at)).map(Outcome::Nearest)
            }
            EditorCommand::DumpModel => Ok(Outcome::Dump {
                json: self.dump_model(),
            }),
            EditorCommand::Pan { direction } => self.pan(direction),
            EditorCommand::Zoom { direction } => self.zoom(direction),
            EditorCommand::RescaleToFit => self.rescale_to_fit(),
            EditorCommand::Undo => self.undo(),
            EditorCommand::Solve { force } => self.request_solve(force).map(Outcome::SolveRequested),
            EditorCommand::SolveResponse { message } => self.receive_solve_response(&message),
            EditorCommand::Save { confirm_unsolved } => self
                .save(confirm_unsolved)
                .map(|chunks| Outcome::Saved { chunks }),
            EditorCommand::Cancel => self.cancel(),
            EditorCommand::Status => Ok(Outcome::Status(self.status_report())),
        }
    }

    // ── Shared helpers ────────────────────────────────────────

    /// Snapshot the current model and mode before a mutation.
    pub(crate) fn save_undo(&mut self) {
        self.undo.save(UndoSnapshot {
            model: self.model.clone(),
            mode: self.mode,
        });
    }

    /// Bump version after a mutation
    pub(crate) fn notify_mutated(&mut self) {
        self.version += 1;
    }

    pub(crate) fn require_mode(
        &self,
        command: &'static str,
        allowed: impl Fn(Mode) -> bool,
    ) -> EditorResult<()> {
        if allowed(self.mode) {
            Ok(())
        } else {
            Err(EditorError::WrongMode {
                command,
                mode: self.mode,
            })
        }
    }

    pub(crate) fn require_no_pending_solve(&self) -> EditorResult<()> {
        if self.pending_solve.is_some() {
            Err(EditorError::SolveInFlight)
        } else {
            Ok(())
        }
    }

    /// Mode after an edit: Constraining once closed, Drawing while open
    pub(crate) fn settled_mode(&self) -> Mode {
        if self.model.is_closed() {
            Mode::Constraining
        } else {
            Mode::Drawing
        }
    }

    /// Restore the last snapshot.
    pub fn undo(&mut self) -> EditorResult<Outcome> {
        self.require_no_pending_solve()?;
        let snapshot = self.undo.undo().ok_or(EditorError::NothingToUndo)?;
        self.model = snapshot.model;
        self.mode = snapshot.mode;
        self.pending_offset = None;
        self.repair = None;
        self.cursor = None;
        self.notify_mutated();
        tracing::debug!("Undo: back to {:?}", self.mode);
        Ok(Outcome::Updated)
    }

    /// Mode the session settles in once a pending sub-mode is wound up.
    pub(crate) fn resume_mode(&self) -> Mode {
        match (&self.pending_offset, self.mode) {
            (Some(pending), _) => pending.resume,
            (None, Mode::SettingCurvature) => self.settled_mode(),
            (None, mode) => mode,
        }
    }

    /// Wind up a pending sub-mode before the editor closes.
    ///
    /// A half-built W/D is dropped together with its snapshot; an arc keeps
    /// its previewed bulge.
    pub(crate) fn leave_sub_mode(&mut self) {
        let resume = self.resume_mode();
        if let Some(pending) = self.pending_offset.take() {
            self.undo.undo();
            tracing::debug!("Dropped pending {} on point {}", pending.kind, pending.base);
        }
        if resume != self.mode {
            self.mode = resume;
            self.cursor = None;
            self.notify_mutated();
        }
    }

    /// Close the editor without saving. Half-built W/D constraints are dropped.
    pub fn cancel(&mut self) -> EditorResult<Outcome> {
        self.leave_sub_mode();
        if let Some(pending) = self.pending_solve.take() {
            tracing::warn!("Cancel drops pending solve {}", pending.request_id);
        }
        self.closed = true;
        tracing::info!("Sketch editor closed without saving");
        Ok(Outcome::Closed)
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            mode: self.mode,
            mode_code: self.mode.code(),
            variables: self.model.degrees_of_freedom(),
            constraints: self.model.constraint_count(),
            remaining_dof: self.model.remaining_dof(),
            solve_pending: self.pending_solve.is_some(),
            closed: self.closed,
            calibration: self.model.calibration,
            line: crate::i18n::status_line(self),
        }
    }
}
