//! Text protocol spoken with the solver and the host document.
//!
//! Messages are pipe-delimited sections of semicolon-delimited fields.
//! Indices on the wire are 1-based; negative secondaries are sentinels.

pub mod load;
pub mod save;
pub mod solve;

use shared::CalibrationField;
use thiserror::Error;

pub use load::{parse_load_message, restore_model, LoadRequest, RawSegment, LOAD_COMMAND};
pub use save::{
    build_save_chunks, build_save_payload, reassemble_save_chunks, MAX_MESSAGE_LEN, SAVE_COMMAND,
};
pub use solve::{
    build_solve_request, interpret_solve_response, RepairAction, RepairHint, RepairItem,
    SolveOutcome, SOLVE_COMMAND,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Cannot serialize without calibration ({0:?} missing)")]
    Uncalibrated(Vec<CalibrationField>),

    #[error("Malformed number '{0}'")]
    MalformedNumber(String),

    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Unknown type code '{0}'")]
    UnknownCode(String),

    #[error("Indices {primary};{secondary} do not fit a '{code}' constraint")]
    BadIndices {
        code: char,
        primary: i64,
        secondary: i64,
    },

    #[error("Message is missing its {0} section")]
    MissingSection(&'static str),

    #[error("Unexpected message '{0}'")]
    UnexpectedCommand(String),

    #[error("Variable '{0}' is missing or not numeric")]
    MissingVariable(String),

    #[error("Invalid segment chain: {0}")]
    InvalidChain(String),

    #[error("Broken chunk sequence: {0}")]
    ChunkSequence(String),
}

/// Fixed 6-decimal formatting; tiny values print as plain zero.
pub fn format_number(value: f64) -> String {
    let value = if value.abs() < 5e-7 { 0.0 } else { value };
    format!("{value:.6}")
}

/// Split a `a;b;c;` list. A trailing separator does not produce an empty field.
pub(crate) fn fields(section: &str) -> Vec<&str> {
    let section = section.trim();
    if section.is_empty() {
        return Vec::new();
    }
    section
        .strip_suffix(';')
        .unwrap_or(section)
        .split(';')
        .map(str::trim)
        .collect()
}

pub(crate) fn parse_f64(field: &str) -> Result<f64, ProtocolError> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProtocolError::MalformedNumber(field.to_string()))
}

pub(crate) fn parse_i64(field: &str) -> Result<i64, ProtocolError> {
    field
        .parse::<i64>()
        .map_err(|_| ProtocolError::MalformedNumber(field.to_string()))
}

pub(crate) fn parse_code(field: &str) -> Result<char, ProtocolError> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ProtocolError::UnknownCode(field.to_string())),
    }
}
