//! Starting, loading and drawing the segment chain

use kurbo::Point;
use shared::{Constraint, ConstraintKind, ConstraintTarget, SegmentKind, ZMarker, ANCHOR};

use super::{Outcome, SketchSession};
use crate::error::{EditorError, EditorResult};
use crate::protocol::{load::anchor_constraints, parse_load_message, restore_model};
use crate::sketch::dip_from_cursor;
use crate::state::Mode;

impl SketchSession {
    /// Create the anchor point and pin it with the default X/Y constraints.
    pub fn begin(&mut self, at: Option<Point>) -> EditorResult<Outcome> {
        self.require_mode("begin", |m| m == Mode::Initializing)?;
        let at = at.unwrap_or_else(|| {
            let [cx, cy] = self.settings.canvas.center();
            Point::new(cx, cy)
        });

        self.save_undo();
        self.model.add_point(at.x, at.y);
        for c in anchor_constraints(&self.begin) {
            self.model.constraints.push(c);
        }
        self.model.refresh();
        self.mode = Mode::Drawing;
        self.notify_mutated();
        tracing::info!("New sketch started at ({:.1}, {:.1})", at.x, at.y);
        Ok(Outcome::Updated)
    }

    /// Replace the empty model with the one described by a `loadSketch` message.
    pub fn load(&mut self, message: &str) -> EditorResult<Outcome> {
        self.require_mode("load", |m| m == Mode::Initializing)?;
        let request = parse_load_message(message)?;
        let model = restore_model(&request, self.settings.canvas, self.settings.fit_margin)?;

        self.branch = request.branch;
        self.begin = request.begin;
        self.model = model;
        self.undo.clear();
        self.mode = self.settled_mode();
        self.notify_mutated();
        tracing::info!(
            "Loaded sketch '{}': {} points, {} segments, {} constraints",
            self.branch,
            self.model.points.len(),
            self.model.segments.len(),
            self.model.constraints.len()
        );
        Ok(Outcome::Updated)
    }

    /// Snap to the previous point's x or y when within the halo.
    fn snap_to_previous(&self, at: Point, previous: Point) -> Point {
        let halo = self.settings.halo;
        let x = if (at.x - previous.x).abs() < halo {
            previous.x
        } else {
            at.x
        };
        let y = if (at.y - previous.y).abs() < halo {
            previous.y
        } else {
            at.y
        };
        Point::new(x, y)
    }

    fn coincides(&self, a: Point, b: Point) -> bool {
        let halo = self.settings.halo;
        (a.x - b.x).abs() < halo && (a.y - b.y).abs() < halo
    }

    /// Append a segment ending at `at`. Landing on the anchor closes the sketch.
    pub fn append(&mut self, kind: SegmentKind, at: Point) -> EditorResult<Outcome> {
        let command = match kind {
            SegmentKind::Line => "append_line",
            SegmentKind::CircularArc => "append_arc",
            SegmentKind::SplinePoint => "append_spline_point",
            SegmentKind::BezierPoint => "append_bezier_point",
        };
        self.require_mode(command, |m| m == Mode::Drawing)?;
        let last = self.model.last_point().ok_or(EditorError::WrongMode {
            command,
            mode: self.mode,
        })?;
        let previous = self.model.point_pos(last);
        let at = self.snap_to_previous(at, previous);

        let closing = self.coincides(at, self.model.point_pos(ANCHOR));
        if closing {
            let needed = if kind == SegmentKind::Line { 2 } else { 1 };
            if self.model.segments.len() < needed {
                return Err(EditorError::TooFewSegmentsToClose);
            }
        } else if self.coincides(at, previous) {
            return Err(EditorError::DegenerateSegment);
        }

        self.save_undo();
        let end = if closing {
            ANCHOR
        } else {
            self.model.add_point(at.x, at.y)
        };
        self.model.push_segment(kind, last, end);
        self.cursor = None;
        self.mode = if kind == SegmentKind::CircularArc {
            Mode::SettingCurvature
        } else {
            self.settled_mode()
        };
        self.notify_mutated();
        if closing {
            tracing::info!("Sketch closed with {} segments", self.model.segments.len());
        }
        Ok(Outcome::Updated)
    }

    /// Split a spline/Bezier run with a zero-length line ending at a duplicate point.
    pub fn append_zero_length(&mut self) -> EditorResult<Outcome> {
        self.require_mode("append_zero_length", |m| m == Mode::Drawing)?;
        let last_kind = self.model.segments.last().map(|s| s.kind);
        if !last_kind.is_some_and(|k| k.is_curve_run()) {
            return Err(EditorError::ZeroLengthNotAllowed);
        }
        let Some(last) = self.model.last_point() else {
            return Err(EditorError::ZeroLengthNotAllowed);
        };

        self.save_undo();
        let pos = self.model.point_pos(last);
        let duplicate = self.model.add_point(pos.x, pos.y);
        self.model.push_segment(SegmentKind::Line, last, duplicate);
        for marker in [ZMarker::First, ZMarker::Second] {
            self.model.push_constraint(Constraint::new(
                ConstraintKind::ZeroLength,
                ConstraintTarget::ZeroLength {
                    point: duplicate,
                    marker,
                },
                "0",
            ));
        }
        self.notify_mutated();
        Ok(Outcome::Updated)
    }

    /// Close the chain with a straight line back to the anchor.
    pub fn close_sketch(&mut self) -> EditorResult<Outcome> {
        self.require_mode("close_sketch", |m| m == Mode::Drawing)?;
        if self.model.segments.len() < 2 {
            return Err(EditorError::TooFewSegmentsToClose);
        }
        let Some(last) = self.model.last_point() else {
            return Err(EditorError::TooFewSegmentsToClose);
        };

        self.save_undo();
        self.model.push_segment(SegmentKind::Line, last, ANCHOR);
        self.mode = Mode::Constraining;
        self.notify_mutated();
        tracing::info!("Sketch closed with {} segments", self.model.segments.len());
        Ok(Outcome::Updated)
    }

    /// Bulge of the arc being drawn, from the cursor's distance to its chord.
    fn curvature_from_cursor(&mut self, cursor: Point) {
        let Some(index) = self.model.segments.len().checked_sub(1) else {
            return;
        };
        let seg = &self.model.segments[index];
        let dip = dip_from_cursor(
            self.model.point_pos(seg.begin),
            self.model.point_pos(seg.end),
            cursor,
        );
        self.model.set_dip(index, dip);
        self.model.rebuild_variables();
    }

    /// Hover while choosing curvature: preview only, nothing is recorded for undo.
    pub(crate) fn preview_curvature(&mut self, cursor: Point) {
        self.curvature_from_cursor(cursor);
        self.cursor = Some(cursor);
    }

    /// Fix the arc's bulge and leave SettingCurvature.
    pub(crate) fn commit_curvature(&mut self, cursor: Option<Point>) -> EditorResult<Outcome> {
        if let Some(cursor) = cursor {
            self.curvature_from_cursor(cursor);
        }
        self.mode = self.settled_mode();
        self.cursor = None;
        self.notify_mutated();
        tracing::debug!(
            "Arc bulge committed: {:.3}",
            self.model.segments.last().map(|s| s.dip).unwrap_or(0.0)
        );
        Ok(Outcome::Updated)
    }
}
