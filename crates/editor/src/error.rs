//! Errors reported to the user. None of them is fatal to the editor.

use shared::{CalibrationField, ConstraintKind};
use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::state::Mode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    // ── User input ──────────────────────────────────────────
    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("A value is required for a {} constraint", .0.display_name())]
    ValueRequired(ConstraintKind),

    #[error("{} already has a {} constraint", .entity, .kind.display_name())]
    ConstraintExists { kind: ConstraintKind, entity: String },

    #[error("Several constraints here ({codes}); choose one to delete")]
    AmbiguousDeletion { codes: String },

    #[error("No {} constraint here", .0.display_name())]
    NoSuchConstraint(ConstraintKind),

    #[error("Nothing within reach of the cursor")]
    NothingNearby,

    #[error("No constraint here")]
    NoConstraintHere,

    #[error("Target point must differ from the base point")]
    SameOffsetPoint,

    // ── Structural ──────────────────────────────────────────
    #[error("A {} constraint cannot be applied to {reason}", .kind.display_name())]
    NotApplicable { kind: ConstraintKind, reason: String },

    #[error("{} conflicts with the existing {} constraint", .requested.display_name(), .existing.display_name())]
    ConflictingConstraint {
        requested: ConstraintKind,
        existing: ConstraintKind,
    },

    #[error("A zero-length segment may only follow a spline or Bezier segment")]
    ZeroLengthNotAllowed,

    #[error("Zero-length constraints cannot be deleted")]
    ZeroLengthLocked,

    #[error("New point coincides with the previous point")]
    DegenerateSegment,

    #[error("Not enough segments to close the sketch")]
    TooFewSegmentsToClose,

    #[error("'{command}' is not available in {mode:?} mode")]
    WrongMode { command: &'static str, mode: Mode },

    // ── Solver ──────────────────────────────────────────────
    #[error("Solver: {0}")]
    SolverReported(String),

    #[error("Solver unreachable: {0}")]
    SolverUnreachable(String),

    #[error("A solve request is already in flight")]
    SolveInFlight,

    #[error("No solve request is pending")]
    NoPendingSolve,

    #[error("Sketch has {variables} variables but {constraints} constraints")]
    NotFullyConstrained { variables: usize, constraints: usize },

    // ── Calibration ─────────────────────────────────────────
    #[error("Calibration incomplete: missing {}", join_fields(.missing))]
    CalibrationIncomplete { missing: Vec<CalibrationField> },

    // ── Undo / lifecycle ────────────────────────────────────
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("The sketch is not solved and may break the build; confirm to save anyway")]
    UnsolvedSave,

    #[error("The editor session is closed")]
    SessionClosed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type EditorResult<T> = Result<T, EditorError>;

fn join_fields(fields: &[CalibrationField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_message_names_fields() {
        let err = EditorError::CalibrationIncomplete {
            missing: vec![CalibrationField::Scale, CalibrationField::YOrigin],
        };
        assert_eq!(err.to_string(), "Calibration incomplete: missing scale, Y-origin");
    }

    #[test]
    fn test_conflict_message() {
        let err = EditorError::ConflictingConstraint {
            requested: ConstraintKind::Horizontal,
            existing: ConstraintKind::Vertical,
        };
        assert_eq!(
            err.to_string(),
            "horizontal conflicts with the existing vertical constraint"
        );
    }
}
