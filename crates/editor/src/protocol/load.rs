//! Load message from the host document

use shared::{
    numeric_value, BeginPoint, Calibration, Constraint, ConstraintKind, ConstraintTarget,
    SegmentKind, Variable, ANCHOR,
};

use super::{fields, parse_code, parse_i64, ProtocolError};
use crate::state::{CanvasSize, SketchModel};

pub const LOAD_COMMAND: &str = "loadSketch";

/// Segment as listed by the host, indices already 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSegment {
    pub kind: SegmentKind,
    pub begin: usize,
    pub end: usize,
}

/// Parsed `loadSketch` message
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub branch: String,
    pub begin: BeginPoint,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub segments: Vec<RawSegment>,
}

impl LoadRequest {
    /// No geometry yet: the editor starts a fresh sketch
    pub fn is_fresh(&self) -> bool {
        self.segments.is_empty()
    }

    fn variable(&self, name: &str) -> Option<f64> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .and_then(|v| numeric_value(&v.value))
    }
}

/// `loadSketch|<branch>|x;y;z;rel|<variables>|<constraints>|<segments>|`
pub fn parse_load_message(message: &str) -> Result<LoadRequest, ProtocolError> {
    let mut sections = message.trim().split('|');
    let command = sections.next().unwrap_or_default();
    if command != LOAD_COMMAND {
        return Err(ProtocolError::UnexpectedCommand(command.to_string()));
    }
    let branch = sections
        .next()
        .ok_or(ProtocolError::MissingSection("branch"))?;
    let begin = parse_begin(sections.next().ok_or(ProtocolError::MissingSection("begin point"))?)?;
    let variables =
        parse_variables(sections.next().ok_or(ProtocolError::MissingSection("variables"))?)?;
    let constraints =
        parse_constraints(sections.next().ok_or(ProtocolError::MissingSection("constraints"))?)?;
    let segments =
        parse_segments(sections.next().ok_or(ProtocolError::MissingSection("segments"))?)?;

    Ok(LoadRequest {
        branch: branch.trim().to_string(),
        begin,
        variables,
        constraints,
        segments,
    })
}

fn parse_begin(section: &str) -> Result<BeginPoint, ProtocolError> {
    let f = fields(section);
    if f.len() != 4 {
        return Err(ProtocolError::FieldCount {
            expected: 4,
            found: f.len(),
        });
    }
    let or_zero = |s: &str| if s.is_empty() { "0".to_string() } else { s.to_string() };
    Ok(BeginPoint {
        x: or_zero(f[0]),
        y: or_zero(f[1]),
        z: or_zero(f[2]),
        relative: matches!(f[3], "1" | "true"),
    })
}

fn check_multiple(list: &[&str], stride: usize) -> Result<(), ProtocolError> {
    if list.len() % stride != 0 {
        return Err(ProtocolError::FieldCount {
            expected: list.len().div_ceil(stride) * stride,
            found: list.len(),
        });
    }
    Ok(())
}

fn parse_variables(section: &str) -> Result<Vec<Variable>, ProtocolError> {
    let list = fields(section);
    check_multiple(&list, 2)?;
    Ok(list
        .chunks_exact(2)
        .map(|pair| Variable {
            name: pair[0].to_string(),
            value: pair[1].to_string(),
        })
        .collect())
}

fn parse_constraints(section: &str) -> Result<Vec<Constraint>, ProtocolError> {
    let list = fields(section);
    check_multiple(&list, 4)?;
    list.chunks_exact(4)
        .map(|quad| {
            let code = parse_code(quad[0])?;
            let kind = ConstraintKind::from_code(code)
                .ok_or_else(|| ProtocolError::UnknownCode(quad[0].to_string()))?;
            let primary = parse_i64(quad[1])?;
            let secondary = parse_i64(quad[2])?;
            let target = ConstraintTarget::from_wire(kind, primary, secondary).ok_or(
                ProtocolError::BadIndices {
                    code,
                    primary,
                    secondary,
                },
            )?;
            Ok(Constraint::new(kind, target, quad[3]))
        })
        .collect()
}

fn parse_segments(section: &str) -> Result<Vec<RawSegment>, ProtocolError> {
    let list = fields(section);
    check_multiple(&list, 3)?;
    list.chunks_exact(3)
        .map(|triple| {
            let kind = SegmentKind::from_code(parse_code(triple[0])?)
                .ok_or_else(|| ProtocolError::UnknownCode(triple[0].to_string()))?;
            let begin = parse_i64(triple[1])?;
            let end = parse_i64(triple[2])?;
            if begin < 1 || end < 1 {
                return Err(ProtocolError::InvalidChain(format!(
                    "segment indices {begin};{end} must be 1-based"
                )));
            }
            Ok(RawSegment {
                kind,
                begin: (begin - 1) as usize,
                end: (end - 1) as usize,
            })
        })
        .collect()
}

/// Default X/Y constraints pinning the anchor to the begin point
pub fn anchor_constraints(begin: &BeginPoint) -> [Constraint; 2] {
    let (x, y) = begin.anchor_values();
    [
        Constraint::new(ConstraintKind::X, ConstraintTarget::Point { index: ANCHOR }, x),
        Constraint::new(ConstraintKind::Y, ConstraintTarget::Point { index: ANCHOR }, y),
    ]
}

/// Build the model described by a load request and fit it to the canvas.
///
/// Physical coordinates are kept exactly: the calibration starts as the identity
/// (screen y flipped) and follows the fitting transform.
pub fn restore_model(
    request: &LoadRequest,
    canvas: CanvasSize,
    margin: f64,
) -> Result<SketchModel, ProtocolError> {
    let mut model = SketchModel::default();

    if request.is_fresh() {
        let [cx, cy] = canvas.center();
        model.add_point(cx, cy);
        for c in anchor_constraints(&request.begin) {
            model.constraints.push(c);
        }
        model.refresh();
        return Ok(model);
    }

    let point_count = request
        .segments
        .iter()
        .map(|s| s.begin.max(s.end) + 1)
        .max()
        .unwrap_or(1);

    model.calibration = Calibration {
        scale: Some(1.0),
        xorig: Some(0.0),
        yorig: Some(0.0),
    };
    for k in 1..=point_count {
        let x_name = format!("x{k}");
        let y_name = format!("y{k}");
        let x = request
            .variable(&x_name)
            .ok_or(ProtocolError::MissingVariable(x_name))?;
        let y = request
            .variable(&y_name)
            .ok_or(ProtocolError::MissingVariable(y_name))?;
        model.add_point(x, -y);
    }
    for (j, raw) in request.segments.iter().enumerate() {
        let mut seg = shared::Segment::new(raw.kind, raw.begin, raw.end);
        if raw.kind == SegmentKind::CircularArc {
            seg.dip = request.variable(&format!("d{}", j + 1)).unwrap_or(0.0);
        }
        model.segments.push(seg);
    }
    model
        .validate_chain()
        .map_err(ProtocolError::InvalidChain)?;

    for c in &request.constraints {
        let in_range = match c.target {
            ConstraintTarget::Point { index } => index < model.points.len(),
            ConstraintTarget::Segment { index } => index < model.segments.len(),
            ConstraintTarget::Offset { base, target } => {
                base < model.points.len() && target < model.points.len()
            }
            ConstraintTarget::ZeroLength { point, .. } => point < model.points.len(),
        };
        if !in_range {
            let (primary, secondary) = c.target.to_wire();
            return Err(ProtocolError::BadIndices {
                code: c.kind.code(),
                primary,
                secondary,
            });
        }
        model.constraints.push(c.clone());
    }
    if model.constraints.is_empty() {
        model.constraints.extend(anchor_constraints(&request.begin));
    }

    model.refresh();
    model.fit_view(canvas.width, canvas.height, margin);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRIANGLE: &str = "loadSketch|main|0;0;0;0|\
        x1;0;y1;0;x2;5;y2;0;x3;5;y3;5;|\
        X;1;-1;0;Y;1;-1;0;L;1;-1;5;|\
        L;1;2;L;2;3;L;3;1;|";

    #[test]
    fn test_parse_load_sections() {
        let req = parse_load_message(TRIANGLE).unwrap();
        assert_eq!(req.branch, "main");
        assert!(!req.begin.relative);
        assert_eq!(req.variables.len(), 6);
        assert_eq!(req.constraints.len(), 3);
        assert_eq!(
            req.segments[2],
            RawSegment {
                kind: SegmentKind::Line,
                begin: 2,
                end: 0
            }
        );
    }

    #[test]
    fn test_restore_keeps_physical_coordinates() {
        let req = parse_load_message(TRIANGLE).unwrap();
        let m = restore_model(&req, CanvasSize::default(), 0.1).unwrap();
        assert!(m.is_closed());
        assert!(m.calibration.is_complete());
        let p3 = m.calibration.to_physical(m.points[2].x, m.points[2].y).unwrap();
        assert_relative_eq!(p3[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(p3[1], 5.0, epsilon = 1e-9);
        assert_eq!(m.variables[4].value, "5.000000");
        // fitted into the 800x600 canvas
        let bbox = m.bounding_box().unwrap();
        assert_relative_eq!(bbox.center().x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.height(), 480.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fresh_load_pins_anchor() {
        let req = parse_load_message("loadSketch|b|w/2;3;0;0||||").unwrap();
        assert!(req.is_fresh());
        let m = restore_model(&req, CanvasSize::default(), 0.1).unwrap();
        assert_eq!(m.points.len(), 1);
        assert_eq!((m.points[0].x, m.points[0].y), (400.0, 300.0));
        assert_eq!(m.constraints[0].value, "w/2");
        assert_eq!(m.points[0].label, "XY");
    }

    #[test]
    fn test_relative_begin_point_defaults_to_zero() {
        let req = parse_load_message("loadSketch|b|7;8;0;1||||").unwrap();
        let m = restore_model(&req, CanvasSize::default(), 0.1).unwrap();
        assert_eq!(m.constraints[0].value, "0");
        assert_eq!(m.constraints[1].value, "0");
    }

    #[test]
    fn test_zero_constraints_get_anchor_defaults() {
        let msg = "loadSketch|b|1;2;0;0|x1;0;y1;0;x2;5;y2;0;|||L;1;2;|";
        let req = parse_load_message(msg).unwrap();
        let m = restore_model(&req, CanvasSize::default(), 0.1).unwrap();
        assert!(!m.is_closed());
        assert_eq!(m.constraints.len(), 2);
        assert_eq!(m.constraints[0].value, "1");
    }

    #[test]
    fn test_arc_dip_restored() {
        let msg = "loadSketch|b|0;0;0;0|x1;0;y1;0;x2;10;y2;0;d1;5;||C;1;2;L;2;1;|";
        let req = parse_load_message(msg).unwrap();
        let m = restore_model(&req, CanvasSize::default(), 0.0).unwrap();
        let scale = m.calibration.scale.unwrap();
        assert_relative_eq!(m.segments[0].dip * scale, 5.0, epsilon = 1e-9);
        assert!(m.segments[0].arc.is_some());
    }

    #[test]
    fn test_missing_variable() {
        let msg = "loadSketch|b|0;0;0;0|x1;0;y1;0;x2;5;y2;;||L;1;2;|";
        let req = parse_load_message(msg).unwrap();
        assert_eq!(
            restore_model(&req, CanvasSize::default(), 0.1),
            Err(ProtocolError::MissingVariable("y2".to_string()))
        );
    }

    #[test]
    fn test_broken_chain_rejected() {
        let msg = "loadSketch|b|0;0;0;0|x1;0;y1;0;x2;5;y2;0;x3;5;y3;5;||L;1;2;L;1;3;|";
        let req = parse_load_message(msg).unwrap();
        assert!(matches!(
            restore_model(&req, CanvasSize::default(), 0.1),
            Err(ProtocolError::InvalidChain(_))
        ));
    }

    #[test]
    fn test_constraint_out_of_range() {
        let msg = "loadSketch|b|0;0;0;0|x1;0;y1;0;x2;5;y2;0;|X;9;-1;0;|L;1;2;|";
        let req = parse_load_message(msg).unwrap();
        assert!(matches!(
            restore_model(&req, CanvasSize::default(), 0.1),
            Err(ProtocolError::BadIndices { code: 'X', .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_load_message("solveSketch|x"),
            Err(ProtocolError::UnexpectedCommand(_))
        ));
        assert_eq!(
            parse_load_message("loadSketch|b|0;0;0;0|"),
            Err(ProtocolError::MissingSection("constraints"))
        );
        assert!(matches!(
            parse_load_message("loadSketch|b|0;0;0;0||W;1;-1;5;||"),
            Err(ProtocolError::BadIndices { code: 'W', .. })
        ));
        assert!(matches!(
            parse_load_message("loadSketch|b|0;0;0;0|||Q;1;2;|"),
            Err(ProtocolError::UnknownCode(_))
        ));
    }
}
