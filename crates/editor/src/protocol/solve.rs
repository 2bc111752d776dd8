//! Solve request / response

use serde::Serialize;
use shared::{Constraint, ConstraintKind, ConstraintTarget};

use super::{fields, format_number, parse_code, parse_f64, parse_i64, ProtocolError};
use crate::state::SketchModel;

pub const SOLVE_COMMAND: &str = "solveSketch";

const DELETE_PREFIX: &str = "*del";
const ADD_PREFIX: &str = "*add";
const ERROR_MARKER: &str = "error";

/// `x;y;bulge;` per point in physical units. The bulge is the one of the segment ending at the point.
pub(crate) fn write_point_triples(out: &mut String, model: &SketchModel) -> Result<(), ProtocolError> {
    let cal = model.calibration;
    let scale = cal
        .scale
        .ok_or_else(|| ProtocolError::Uncalibrated(cal.missing()))?;
    for (i, p) in model.points.iter().enumerate() {
        let phys = cal
            .to_physical(p.x, p.y)
            .ok_or_else(|| ProtocolError::Uncalibrated(cal.missing()))?;
        let bulge = model
            .incoming_segment(i)
            .map(|s| model.segments[s].dip * scale)
            .unwrap_or(0.0);
        out.push_str(&format_number(phys[0]));
        out.push(';');
        out.push_str(&format_number(phys[1]));
        out.push(';');
        out.push_str(&format_number(bulge));
        out.push(';');
    }
    Ok(())
}

/// `code;primary;secondary;value;` per constraint.
pub(crate) fn write_constraint_quads(out: &mut String, constraints: &[Constraint]) {
    for c in constraints {
        let (primary, secondary) = c.target.to_wire();
        out.push(c.kind.code());
        out.push(';');
        out.push_str(&primary.to_string());
        out.push(';');
        out.push_str(&secondary.to_string());
        out.push(';');
        out.push_str(&constraint_value_text(c));
        out.push(';');
    }
}

/// Numeric values are normalized to 6 decimals; symbolic ones go through verbatim.
pub fn constraint_value_text(constraint: &Constraint) -> String {
    match constraint.numeric() {
        Some(v) => format_number(v),
        None => constraint.value.trim().to_string(),
    }
}

/// `solveSketch|<point triples>|<constraint quads>|`
pub fn build_solve_request(model: &SketchModel) -> Result<String, ProtocolError> {
    let mut out = String::from(SOLVE_COMMAND);
    out.push('|');
    write_point_triples(&mut out, model)?;
    out.push('|');
    write_constraint_quads(&mut out, &model.constraints);
    out.push('|');
    Ok(out)
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    /// Over-determined: these constraints jointly conflict
    Delete,
    /// Under-determined: constraints may be added at these slots
    Add,
}

/// One flagged constraint (or constraint slot), wire indices as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairItem {
    pub kind: ConstraintKind,
    pub primary: i64,
    pub secondary: i64,
}

impl RepairItem {
    pub fn target(&self) -> Option<ConstraintTarget> {
        ConstraintTarget::from_wire(self.kind, self.primary, self.secondary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairHint {
    pub action: RepairAction,
    pub items: Vec<RepairItem>,
}

impl RepairHint {
    /// Whether an existing constraint is flagged by this hint
    pub fn flags(&self, constraint: &Constraint) -> bool {
        self.items
            .iter()
            .any(|item| item.kind == constraint.kind && item.target() == Some(constraint.target))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Solver error text, shown as-is
    Failure(String),
    Repair(RepairHint),
    /// Physical `[x, y, bulge]` per point
    Success(Vec<[f64; 3]>),
}

pub fn interpret_solve_response(
    message: &str,
    point_count: usize,
) -> Result<SolveOutcome, ProtocolError> {
    let body = message.trim();
    let body = match body.split_once('|') {
        Some((command, rest)) if command == SOLVE_COMMAND => rest,
        Some((command, _)) if !command.contains(';') && !command.starts_with('*') => {
            return Err(ProtocolError::UnexpectedCommand(command.to_string()))
        }
        _ => body,
    };
    let body = body.trim().trim_end_matches('|').trim();

    if let Some(rest) = body.strip_prefix(DELETE_PREFIX) {
        return parse_repair(RepairAction::Delete, rest).map(SolveOutcome::Repair);
    }
    if let Some(rest) = body.strip_prefix(ADD_PREFIX) {
        return parse_repair(RepairAction::Add, rest).map(SolveOutcome::Repair);
    }
    if body.to_ascii_lowercase().contains(ERROR_MARKER) {
        return Ok(SolveOutcome::Failure(body.to_string()));
    }

    let values = fields(body);
    if values.len() != point_count * 3 {
        return Err(ProtocolError::FieldCount {
            expected: point_count * 3,
            found: values.len(),
        });
    }
    let numbers = values
        .iter()
        .map(|f| parse_f64(f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SolveOutcome::Success(
        numbers
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
    ))
}

fn parse_repair(action: RepairAction, rest: &str) -> Result<RepairHint, ProtocolError> {
    let list = fields(rest.trim_start_matches(';'));
    if list.len() % 3 != 0 {
        return Err(ProtocolError::FieldCount {
            expected: list.len().div_ceil(3) * 3,
            found: list.len(),
        });
    }
    let items = list
        .chunks_exact(3)
        .map(|triple| {
            let code = parse_code(triple[0])?;
            let kind = ConstraintKind::from_code(code)
                .ok_or_else(|| ProtocolError::UnknownCode(triple[0].to_string()))?;
            Ok(RepairItem {
                kind,
                primary: parse_i64(triple[1])?,
                secondary: parse_i64(triple[2])?,
            })
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;
    Ok(RepairHint { action, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Calibration, SegmentKind, ZMarker};

    fn calibrated_triangle() -> SketchModel {
        let mut m = SketchModel::default();
        m.add_point(0.0, 100.0);
        m.add_point(100.0, 100.0);
        m.add_point(100.0, 0.0);
        m.push_segment(SegmentKind::Line, 0, 1);
        m.push_segment(SegmentKind::Line, 1, 2);
        m.push_segment(SegmentKind::Line, 2, 0);
        m.calibration = Calibration {
            scale: Some(0.05),
            xorig: Some(0.0),
            yorig: Some(100.0),
        };
        m.push_constraint(Constraint::new(
            ConstraintKind::X,
            ConstraintTarget::Point { index: 0 },
            "0",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::Length,
            ConstraintTarget::Segment { index: 0 },
            "5",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::Width,
            ConstraintTarget::Offset { base: 0, target: 2 },
            "w",
        ));
        m
    }

    // --- Request ---

    #[test]
    fn test_solve_request_layout() {
        let msg = build_solve_request(&calibrated_triangle()).unwrap();
        assert_eq!(
            msg,
            "solveSketch|\
             0.000000;0.000000;0.000000;\
             5.000000;0.000000;0.000000;\
             5.000000;5.000000;0.000000;|\
             X;1;-1;0.000000;L;1;-1;5.000000;W;1;3;w;|"
        );
    }

    #[test]
    fn test_closing_point_gets_last_bulge() {
        let mut m = calibrated_triangle();
        m.segments[2].kind = SegmentKind::CircularArc;
        m.set_dip(2, 20.0);
        let msg = build_solve_request(&m).unwrap();
        let triples = msg.split('|').nth(1).unwrap();
        // point 0 is reached by the closing arc: 20 px * 0.05
        assert!(triples.starts_with("0.000000;0.000000;1.000000;"));
    }

    #[test]
    fn test_request_requires_calibration() {
        let mut m = calibrated_triangle();
        m.calibration.yorig = None;
        assert!(matches!(
            build_solve_request(&m),
            Err(ProtocolError::Uncalibrated(_))
        ));
    }

    #[test]
    fn test_zero_length_sentinels_on_wire() {
        let mut out = String::new();
        write_constraint_quads(
            &mut out,
            &[Constraint::new(
                ConstraintKind::ZeroLength,
                ConstraintTarget::ZeroLength {
                    point: 4,
                    marker: ZMarker::Second,
                },
                "0",
            )],
        );
        assert_eq!(out, "Z;5;-3;0.000000;");
    }

    // --- Response ---

    #[test]
    fn test_success_response() {
        let outcome =
            interpret_solve_response("solveSketch|0;0;0;5;0;0;5;5;-1.5;|", 3).unwrap();
        match outcome {
            SolveOutcome::Success(values) => {
                assert_eq!(values.len(), 3);
                assert_eq!(values[2], [5.0, 5.0, -1.5]);
            }
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_success_without_prefix() {
        let outcome = interpret_solve_response("1;2;0;", 1).unwrap();
        assert_eq!(outcome, SolveOutcome::Success(vec![[1.0, 2.0, 0.0]]));
    }

    #[test]
    fn test_wrong_value_count() {
        let err = interpret_solve_response("solveSketch|1;2;0;3;|", 1).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::FieldCount {
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn test_delete_hint() {
        let outcome = interpret_solve_response("solveSketch|*del;X;1;-1;L;1;-1;|", 3).unwrap();
        let SolveOutcome::Repair(hint) = outcome else {
            panic!("Expected repair hint");
        };
        assert_eq!(hint.action, RepairAction::Delete);
        assert_eq!(hint.items.len(), 2);
        let m = calibrated_triangle();
        assert!(hint.flags(&m.constraints[0]));
        assert!(hint.flags(&m.constraints[1]));
        assert!(!hint.flags(&m.constraints[2]));
    }

    #[test]
    fn test_add_hint() {
        let outcome = interpret_solve_response("*add;H;2;-1;", 3).unwrap();
        let SolveOutcome::Repair(hint) = outcome else {
            panic!("Expected repair hint");
        };
        assert_eq!(hint.action, RepairAction::Add);
        assert_eq!(
            hint.items[0].target(),
            Some(ConstraintTarget::Segment { index: 1 })
        );
    }

    #[test]
    fn test_error_payload() {
        let outcome =
            interpret_solve_response("solveSketch|ERROR:: sketch is singular|", 3).unwrap();
        assert_eq!(
            outcome,
            SolveOutcome::Failure("ERROR:: sketch is singular".to_string())
        );
    }

    #[test]
    fn test_bad_repair_payloads() {
        assert!(matches!(
            interpret_solve_response("*del;Q;1;-1;", 3),
            Err(ProtocolError::UnknownCode(_))
        ));
        assert!(matches!(
            interpret_solve_response("*del;X;1;", 3),
            Err(ProtocolError::FieldCount { .. })
        ));
    }

    #[test]
    fn test_foreign_command_rejected() {
        assert!(matches!(
            interpret_solve_response("saveSketch|1|1|x", 3),
            Err(ProtocolError::UnexpectedCommand(_))
        ));
    }
}
