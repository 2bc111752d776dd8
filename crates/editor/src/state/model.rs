//! Sketch model: points, segments, variables, constraints and calibration.
//!
//! All derived data (segment midpoints, arc geometry, labels, variables) is
//! recomputed by [`SketchModel::refresh`] after every mutation.

use std::ops::Range;

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use shared::{
    Calibration, CalibrationField, Constraint, ConstraintKind, ConstraintTarget, Segment,
    SegmentKind, SketchPoint, Variable, ANCHOR,
};

use crate::sketch::{arc_from_bulge, arc_midpoint, eval_bezier, spline_to_bezier};

/// Screen lengths below this cannot calibrate the scale.
const MIN_SCREEN_LENGTH: f64 = 1e-6;

/// A maximal run of consecutive spline or Bezier segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveRun {
    pub kind: SegmentKind,
    pub segments: Range<usize>,
}

/// The mutable sketch: four collections plus the screen ↔ physical calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchModel {
    pub points: Vec<SketchPoint>,
    pub segments: Vec<Segment>,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub calibration: Calibration,
}

impl SketchModel {
    // ── Queries ───────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closed iff the last segment ends at the anchor.
    pub fn is_closed(&self) -> bool {
        self.segments.last().is_some_and(|s| s.end == ANCHOR)
    }

    /// Number of free variables.
    pub fn degrees_of_freedom(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Variables minus constraints (negative when over-constrained).
    pub fn remaining_dof(&self) -> i64 {
        self.variables.len() as i64 - self.constraints.len() as i64
    }

    pub fn is_fully_constrained(&self) -> bool {
        self.constraints.len() == self.variables.len()
    }

    pub fn last_point(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    pub fn point_pos(&self, index: usize) -> Point {
        self.points
            .get(index)
            .map(|p| Point::new(p.x, p.y))
            .unwrap_or(Point::ZERO)
    }

    /// The segment arriving at `point` (for the anchor of a closed sketch, the closing segment).
    pub fn incoming_segment(&self, point: usize) -> Option<usize> {
        if point == ANCHOR {
            return if self.is_closed() {
                Some(self.segments.len() - 1)
            } else {
                None
            };
        }
        self.segments.iter().position(|s| s.end == point)
    }

    /// The segment leaving `point`.
    pub fn outgoing_segment(&self, point: usize) -> Option<usize> {
        self.segments.iter().position(|s| s.begin == point)
    }

    /// Degenerate Line inserted to split a curve run (its end point carries Z constraints).
    pub fn is_zero_length_segment(&self, index: usize) -> bool {
        let Some(seg) = self.segments.get(index) else {
            return false;
        };
        seg.kind == SegmentKind::Line
            && self.constraints.iter().any(|c| {
                matches!(c.target, ConstraintTarget::ZeroLength { point, .. } if point == seg.end)
            })
    }

    /// Chord length of a segment in pixels.
    pub fn screen_length(&self, index: usize) -> f64 {
        self.segments
            .get(index)
            .map(|s| (self.point_pos(s.end) - self.point_pos(s.begin)).hypot())
            .unwrap_or(0.0)
    }

    pub fn find_constraint(&self, kind: ConstraintKind, target: ConstraintTarget) -> Option<usize> {
        self.constraints
            .iter()
            .position(|c| c.kind == kind && c.target == target)
    }

    /// Indices of constraints shown in the point's label (X, Y, P, T, A, Z).
    pub fn constraints_on_point(&self, point: usize) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.target.point() == Some(point))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of constraints shown in the segment's label.
    pub fn constraints_on_segment(&self, segment: usize) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.target.segment() == Some(segment))
            .map(|(i, _)| i)
            .collect()
    }

    /// Maximal runs of consecutive SplinePoint / BezierPoint segments.
    pub fn curve_runs(&self) -> Vec<CurveRun> {
        let mut runs = Vec::new();
        let mut start = 0;
        while start < self.segments.len() {
            let kind = self.segments[start].kind;
            let mut end = start + 1;
            while end < self.segments.len() && self.segments[end].kind == kind {
                end += 1;
            }
            if kind.is_curve_run() {
                runs.push(CurveRun {
                    kind,
                    segments: start..end,
                });
            }
            start = end;
        }
        runs
    }

    /// Points of a run: the begin of its first segment, then each segment's end.
    pub fn run_points(&self, run: &CurveRun) -> Vec<Point> {
        let mut pts = Vec::with_capacity(run.segments.len() + 1);
        if let Some(first) = self.segments.get(run.segments.start) {
            pts.push(self.point_pos(first.begin));
        }
        for seg in &self.segments[run.segments.clone()] {
            pts.push(self.point_pos(seg.end));
        }
        pts
    }

    /// Screen bounding box of points and segment midpoints.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut anchors = self
            .points
            .iter()
            .map(|p| Point::new(p.x, p.y))
            .chain(self.segments.iter().map(|s| Point::new(s.xm, s.ym)));
        let first = anchors.next()?;
        Some(anchors.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)))
    }

    /// Structural invariant: a chain of segments, only the last one may end at the anchor.
    pub fn validate_chain(&self) -> Result<(), String> {
        let last = self.segments.len().saturating_sub(1);
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.begin >= self.points.len() || seg.end >= self.points.len() {
                return Err(format!("segment {} references a missing point", i + 1));
            }
            if i == 0 && seg.begin != ANCHOR {
                return Err("first segment must start at the anchor".to_string());
            }
            if i > 0 && self.segments[i - 1].end != seg.begin {
                return Err(format!(
                    "segment {} does not start where segment {} ends",
                    i + 1,
                    i
                ));
            }
            if seg.end == ANCHOR && i != last {
                return Err(format!("segment {} closes the sketch early", i + 1));
            }
        }
        Ok(())
    }

    // ── Mutations ─────────────────────────────────────────────

    pub fn add_point(&mut self, x: f64, y: f64) -> usize {
        self.points.push(SketchPoint::new(x, y));
        self.points.len() - 1
    }

    pub fn push_segment(&mut self, kind: SegmentKind, begin: usize, end: usize) -> usize {
        self.segments.push(Segment::new(kind, begin, end));
        self.refresh();
        self.segments.len() - 1
    }

    pub fn set_dip(&mut self, segment: usize, dip: f64) {
        if let Some(seg) = self.segments.get_mut(segment) {
            if seg.kind == SegmentKind::CircularArc {
                seg.dip = dip;
            }
        }
        self.refresh_segments();
    }

    pub fn push_constraint(&mut self, constraint: Constraint) -> usize {
        self.constraints.push(constraint);
        self.refresh_labels();
        self.constraints.len() - 1
    }

    pub fn remove_constraint(&mut self, index: usize) -> Constraint {
        let removed = self.constraints.remove(index);
        self.refresh_labels();
        removed
    }

    pub fn move_point(&mut self, index: usize, x: f64, y: f64) {
        if let Some(p) = self.points.get_mut(index) {
            p.x = x;
            p.y = y;
        }
        self.refresh_segments();
        self.rebuild_variables();
    }

    /// Scale and center the bounding box into a `width` × `height` canvas.
    /// A zero-size box is only recentered.
    pub fn fit_view(&mut self, width: f64, height: f64, margin: f64) {
        let Some(bbox) = self.bounding_box() else {
            return;
        };
        let usable_w = width * (1.0 - 2.0 * margin);
        let usable_h = height * (1.0 - 2.0 * margin);
        let fx = (bbox.width() > MIN_SCREEN_LENGTH).then(|| usable_w / bbox.width());
        let fy = (bbox.height() > MIN_SCREEN_LENGTH).then(|| usable_h / bbox.height());
        let factor = match (fx, fy) {
            (Some(a), Some(b)) => a.min(b),
            (Some(f), None) | (None, Some(f)) => f,
            (None, None) => 1.0,
        };
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let center = Point::new(width / 2.0, height / 2.0);
        let offset = center - bbox.center().to_vec2() * factor;
        self.transform_view(factor, offset.to_vec2());
    }

    /// Map every screen position through `p * factor + offset`, keeping physical values fixed.
    pub fn transform_view(&mut self, factor: f64, offset: Vec2) {
        for p in &mut self.points {
            p.x = p.x * factor + offset.x;
            p.y = p.y * factor + offset.y;
        }
        for seg in &mut self.segments {
            seg.dip *= factor;
        }
        let cal = &mut self.calibration;
        cal.scale = cal.scale.map(|s| s / factor);
        cal.xorig = cal.xorig.map(|x| x * factor + offset.x);
        cal.yorig = cal.yorig.map(|y| y * factor + offset.y);
        self.refresh_segments();
    }

    // ── Derived data ──────────────────────────────────────────

    /// Recompute every piece of derived data.
    pub fn refresh(&mut self) {
        self.refresh_segments();
        self.refresh_labels();
        self.rebuild_variables();
    }

    /// Midpoints and arc geometry. Degenerate arcs fall back to straight (dip 0).
    pub fn refresh_segments(&mut self) {
        let positions: Vec<Point> = self.points.iter().map(|p| Point::new(p.x, p.y)).collect();
        let at = |i: usize| positions.get(i).copied().unwrap_or(Point::ZERO);

        for seg in &mut self.segments {
            let (a, b) = (at(seg.begin), at(seg.end));
            let mid = match seg.kind {
                SegmentKind::CircularArc => match arc_from_bulge(a, b, seg.dip) {
                    Some(arc) => {
                        seg.arc = Some(arc);
                        arc_midpoint(a, b, seg.dip)
                    }
                    None => {
                        seg.dip = 0.0;
                        seg.arc = None;
                        a.midpoint(b)
                    }
                },
                SegmentKind::Line | SegmentKind::SplinePoint | SegmentKind::BezierPoint => {
                    seg.dip = 0.0;
                    seg.arc = None;
                    a.midpoint(b)
                }
            };
            seg.xm = mid.x;
            seg.ym = mid.y;
        }

        // Spline segments are picked at the middle of their curve piece
        for run in self.curve_runs() {
            if run.kind != SegmentKind::SplinePoint {
                continue;
            }
            let pieces = spline_to_bezier(&self.run_points(&run));
            for (piece, seg_index) in pieces.iter().zip(run.segments.clone()) {
                let mid = eval_bezier(piece, 0.5);
                self.segments[seg_index].xm = mid.x;
                self.segments[seg_index].ym = mid.y;
            }
        }
    }

    /// Point and segment labels: codes of attached constraints, in constraint order.
    pub fn refresh_labels(&mut self) {
        for p in &mut self.points {
            p.label.clear();
        }
        for s in &mut self.segments {
            s.label.clear();
        }
        for c in &self.constraints {
            match c.target {
                ConstraintTarget::Point { index } | ConstraintTarget::ZeroLength { point: index, .. } => {
                    if let Some(p) = self.points.get_mut(index) {
                        p.label.push(c.kind.code());
                    }
                }
                ConstraintTarget::Segment { index } => {
                    if let Some(s) = self.segments.get_mut(index) {
                        s.label.push(c.kind.code());
                    }
                }
                ConstraintTarget::Offset { .. } => {}
            }
        }
    }

    /// One x/y pair per point and one bulge per arc; values are physical once calibrated.
    pub fn rebuild_variables(&mut self) {
        let cal = self.calibration;
        let mut vars = Vec::with_capacity(self.points.len() * 2 + self.segments.len());
        for (i, p) in self.points.iter().enumerate() {
            let phys = cal.to_physical(p.x, p.y);
            vars.push(Variable {
                name: format!("x{}", i + 1),
                value: phys.map(|v| format!("{:.6}", v[0])).unwrap_or_default(),
            });
            vars.push(Variable {
                name: format!("y{}", i + 1),
                value: phys.map(|v| format!("{:.6}", v[1])).unwrap_or_default(),
            });
        }
        for (j, seg) in self.segments.iter().enumerate() {
            if seg.is_arc() {
                vars.push(Variable {
                    name: format!("d{}", j + 1),
                    value: cal
                        .scale
                        .map(|s| format!("{:.6}", seg.dip * s))
                        .unwrap_or_default(),
                });
            }
        }
        self.variables = vars;
    }

    // ── Calibration ───────────────────────────────────────────

    /// Fill whatever calibration the current constraints determine. Set fields are kept.
    ///
    /// Returns true when anything new was filled in.
    pub fn derive_calibration(&mut self) -> bool {
        let before = self.calibration;
        if self.calibration.scale.is_none() {
            self.calibration.scale = self.scale_from_constraints();
        }
        if let Some(scale) = self.calibration.scale {
            if self.calibration.xorig.is_none() {
                self.calibration.xorig = self
                    .numeric_point_constraint(ConstraintKind::X)
                    .map(|(i, v)| self.points[i].x - v / scale);
            }
            if self.calibration.yorig.is_none() {
                self.calibration.yorig = self
                    .numeric_point_constraint(ConstraintKind::Y)
                    .map(|(i, v)| self.points[i].y + v / scale);
            }
        }
        let changed = before != self.calibration;
        if changed {
            self.rebuild_variables();
        }
        changed
    }

    /// Complete the calibration with a canvas-based guess; returns the guessed fields.
    pub fn fallback_calibration(&mut self, width: f64, height: f64) -> Vec<CalibrationField> {
        let mut guessed = Vec::new();
        if self.calibration.scale.is_none() {
            let span = width.min(height);
            self.calibration.scale = Some(if span > 0.0 { 2.0 / span } else { 1.0 });
            guessed.push(CalibrationField::Scale);
        }
        self.derive_calibration();
        if self.calibration.xorig.is_none() {
            self.calibration.xorig = Some(width / 2.0);
            guessed.push(CalibrationField::XOrigin);
        }
        if self.calibration.yorig.is_none() {
            self.calibration.yorig = Some(height / 2.0);
            guessed.push(CalibrationField::YOrigin);
        }
        self.rebuild_variables();
        guessed
    }

    fn scale_from_constraints(&self) -> Option<f64> {
        let from_length = self.constraints.iter().find_map(|c| match c.target {
            ConstraintTarget::Segment { index } if c.kind == ConstraintKind::Length => {
                let value = c.numeric().filter(|v| *v > 0.0)?;
                let len = self.screen_length(index);
                (len > MIN_SCREEN_LENGTH).then(|| value / len)
            }
            _ => None,
        });
        from_length.or_else(|| {
            self.constraints.iter().find_map(|c| match c.target {
                ConstraintTarget::Segment { index } if c.kind == ConstraintKind::Radius => {
                    let value = c.numeric().filter(|v| *v != 0.0)?;
                    let radius = self.segments.get(index)?.arc?.radius.abs();
                    (radius > MIN_SCREEN_LENGTH).then(|| value.abs() / radius)
                }
                _ => None,
            })
        })
    }

    fn numeric_point_constraint(&self, kind: ConstraintKind) -> Option<(usize, f64)> {
        self.constraints.iter().find_map(|c| match c.target {
            ConstraintTarget::Point { index } if c.kind == kind && index < self.points.len() => {
                c.numeric().map(|v| (index, v))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::ZMarker;

    /// Closed triangle (0,0) → (100,0) → (100,100) → anchor
    fn triangle() -> SketchModel {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(100.0, 0.0);
        m.add_point(100.0, 100.0);
        m.push_segment(SegmentKind::Line, 0, 1);
        m.push_segment(SegmentKind::Line, 1, 2);
        m.push_segment(SegmentKind::Line, 2, 0);
        m
    }

    // --- Queries ---

    #[test]
    fn test_triangle_is_closed() {
        let m = triangle();
        assert!(m.is_closed());
        assert_eq!(m.degrees_of_freedom(), 6);
        assert_eq!(m.constraint_count(), 0);
        assert!(m.validate_chain().is_ok());
    }

    #[test]
    fn test_open_chain_not_closed() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        assert!(!m.is_closed());
        m.add_point(10.0, 0.0);
        m.push_segment(SegmentKind::Line, 0, 1);
        assert!(!m.is_closed());
        assert_eq!(m.incoming_segment(0), None);
        assert_eq!(m.incoming_segment(1), Some(0));
    }

    #[test]
    fn test_incoming_segment_of_anchor_when_closed() {
        let m = triangle();
        assert_eq!(m.incoming_segment(0), Some(2));
        assert_eq!(m.outgoing_segment(0), Some(0));
    }

    #[test]
    fn test_validate_chain_catches_gap() {
        let mut m = triangle();
        m.segments[1].begin = 0;
        assert!(m.validate_chain().is_err());
    }

    // --- Derived data ---

    #[test]
    fn test_line_midpoints() {
        let m = triangle();
        assert_eq!((m.segments[0].xm, m.segments[0].ym), (50.0, 0.0));
        assert_eq!((m.segments[2].xm, m.segments[2].ym), (50.0, 50.0));
    }

    #[test]
    fn test_arc_derived_data_and_degenerate_fallback() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(10.0, 0.0);
        let seg = m.push_segment(SegmentKind::CircularArc, 0, 1);
        m.set_dip(seg, 5.0);
        let arc = m.segments[seg].arc.unwrap();
        assert_relative_eq!(arc.radius, 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.segments[seg].ym, -5.0, epsilon = 1e-12);

        m.set_dip(seg, 1e-12);
        assert_eq!(m.segments[seg].dip, 0.0);
        assert!(m.segments[seg].arc.is_none());
        assert_eq!((m.segments[seg].xm, m.segments[seg].ym), (5.0, 0.0));
    }

    #[test]
    fn test_moving_point_refreshes_arc() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(10.0, 0.0);
        let seg = m.push_segment(SegmentKind::CircularArc, 0, 1);
        m.set_dip(seg, 5.0);
        m.points[1].x = 20.0;
        m.refresh();
        let arc = m.segments[seg].arc.unwrap();
        assert_relative_eq!(arc.xc, 10.0, epsilon = 1e-9);
        assert_relative_eq!(m.segments[seg].xm, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_curve_runs() {
        let mut m = SketchModel::default();
        for i in 0..6 {
            m.add_point(i as f64 * 10.0, (i % 2) as f64 * 10.0);
        }
        m.push_segment(SegmentKind::Line, 0, 1);
        m.push_segment(SegmentKind::SplinePoint, 1, 2);
        m.push_segment(SegmentKind::SplinePoint, 2, 3);
        m.push_segment(SegmentKind::BezierPoint, 3, 4);
        m.push_segment(SegmentKind::BezierPoint, 4, 5);
        let runs = m.curve_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].segments, 1..3);
        assert_eq!(runs[1].kind, SegmentKind::BezierPoint);
        assert_eq!(m.run_points(&runs[0]).len(), 3);
    }

    #[test]
    fn test_spline_midpoint_on_curve() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(50.0, -40.0);
        m.add_point(100.0, 0.0);
        m.push_segment(SegmentKind::SplinePoint, 0, 1);
        m.push_segment(SegmentKind::SplinePoint, 1, 2);
        // the curve bulges past the chord midpoint toward the peak
        assert!(m.segments[0].ym < -20.0);
    }

    #[test]
    fn test_labels_follow_constraints() {
        let mut m = triangle();
        m.push_constraint(Constraint::new(
            ConstraintKind::X,
            ConstraintTarget::Point { index: 0 },
            "0",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::Y,
            ConstraintTarget::Point { index: 0 },
            "0",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::Horizontal,
            ConstraintTarget::Segment { index: 0 },
            "0",
        ));
        assert_eq!(m.points[0].label, "XY");
        assert_eq!(m.segments[0].label, "H");
        m.remove_constraint(0);
        assert_eq!(m.points[0].label, "Y");
    }

    #[test]
    fn test_zero_length_segment_detection() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(10.0, 10.0);
        m.add_point(10.0, 10.0);
        m.push_segment(SegmentKind::SplinePoint, 0, 1);
        m.push_segment(SegmentKind::Line, 1, 2);
        for marker in [ZMarker::First, ZMarker::Second] {
            m.push_constraint(Constraint::new(
                ConstraintKind::ZeroLength,
                ConstraintTarget::ZeroLength { point: 2, marker },
                "0",
            ));
        }
        assert!(m.is_zero_length_segment(1));
        assert!(!m.is_zero_length_segment(0));
        assert_eq!(m.points[2].label, "ZZ");
    }

    #[test]
    fn test_variables_include_arc_bulges() {
        let mut m = SketchModel::default();
        m.add_point(0.0, 0.0);
        m.add_point(10.0, 0.0);
        m.push_segment(SegmentKind::CircularArc, 0, 1);
        m.push_segment(SegmentKind::Line, 1, 0);
        let names: Vec<&str> = m.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x1", "y1", "x2", "y2", "d1"]);
        assert!(m.variables.iter().all(|v| v.value.is_empty()));
    }

    // --- Calibration ---

    #[test]
    fn test_calibration_from_length_then_origins() {
        let mut m = triangle();
        m.push_constraint(Constraint::new(
            ConstraintKind::X,
            ConstraintTarget::Point { index: 0 },
            "0",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::Y,
            ConstraintTarget::Point { index: 0 },
            "0",
        ));
        assert!(!m.derive_calibration());

        m.push_constraint(Constraint::new(
            ConstraintKind::Length,
            ConstraintTarget::Segment { index: 0 },
            "5",
        ));
        assert!(m.derive_calibration());
        assert_relative_eq!(m.calibration.scale.unwrap(), 0.05);
        assert_eq!(m.calibration.xorig, Some(0.0));
        assert_eq!(m.calibration.yorig, Some(0.0));
        assert_eq!(m.variables[2].value, "5.000000");
    }

    #[test]
    fn test_calibration_never_overwritten() {
        let mut m = triangle();
        m.calibration.scale = Some(1.0);
        m.push_constraint(Constraint::new(
            ConstraintKind::Length,
            ConstraintTarget::Segment { index: 0 },
            "5",
        ));
        m.push_constraint(Constraint::new(
            ConstraintKind::X,
            ConstraintTarget::Point { index: 1 },
            "20",
        ));
        m.derive_calibration();
        assert_eq!(m.calibration.scale, Some(1.0));
        assert_eq!(m.calibration.xorig, Some(80.0));
        assert_eq!(m.calibration.yorig, None);
    }

    #[test]
    fn test_symbolic_values_do_not_calibrate() {
        let mut m = triangle();
        m.push_constraint(Constraint::new(
            ConstraintKind::Length,
            ConstraintTarget::Segment { index: 0 },
            "width",
        ));
        assert!(!m.derive_calibration());
        assert_eq!(m.calibration.scale, None);
    }

    #[test]
    fn test_fallback_calibration_guesses_missing() {
        let mut m = triangle();
        let guessed = m.fallback_calibration(800.0, 600.0);
        assert_eq!(
            guessed,
            vec![
                CalibrationField::Scale,
                CalibrationField::XOrigin,
                CalibrationField::YOrigin
            ]
        );
        assert_relative_eq!(m.calibration.scale.unwrap(), 2.0 / 600.0);
        assert_eq!(m.calibration.xorig, Some(400.0));
        assert_eq!(m.calibration.yorig, Some(300.0));
    }

    // --- View transform ---

    #[test]
    fn test_transform_view_keeps_physical_coordinates() {
        let mut m = triangle();
        m.calibration = Calibration {
            scale: Some(0.1),
            xorig: Some(0.0),
            yorig: Some(100.0),
        };
        m.refresh();
        let before: Vec<[f64; 2]> = m
            .points
            .iter()
            .map(|p| m.calibration.to_physical(p.x, p.y).unwrap())
            .collect();
        m.transform_view(2.0, Vec2::new(30.0, -15.0));
        for (p, expected) in m.points.iter().zip(before) {
            let phys = m.calibration.to_physical(p.x, p.y).unwrap();
            assert_relative_eq!(phys[0], expected[0], epsilon = 1e-9);
            assert_relative_eq!(phys[1], expected[1], epsilon = 1e-9);
        }
        assert_eq!((m.points[1].x, m.points[1].y), (230.0, -15.0));
    }

    #[test]
    fn test_fit_view_centers_and_scales() {
        let mut m = triangle();
        m.fit_view(800.0, 600.0, 0.1);
        let bbox = m.bounding_box().unwrap();
        assert_relative_eq!(bbox.height(), 480.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.center().x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.center().y, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_view_single_point_only_recenters() {
        let mut m = SketchModel::default();
        m.add_point(10.0, 20.0);
        m.fit_view(800.0, 600.0, 0.1);
        assert_eq!((m.points[0].x, m.points[0].y), (400.0, 300.0));
    }

    #[test]
    fn test_move_point_refreshes_midpoint() {
        let mut m = triangle();
        m.move_point(1, 200.0, 0.0);
        assert_eq!((m.segments[0].xm, m.segments[0].ym), (100.0, 0.0));
    }

    #[test]
    fn test_bounding_box() {
        let m = triangle();
        let bbox = m.bounding_box().unwrap();
        assert_eq!(bbox, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(SketchModel::default().bounding_box().is_none());
    }
}
