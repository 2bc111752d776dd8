//! Draw list: what the host has to paint for the current session.
//!
//! Items are in screen pixels and in painting order (segments, guides,
//! markers, labels, highlights, status).

use kurbo::Point;
use serde::Serialize;
use shared::{ConstraintTarget, SegmentKind, ANCHOR};

use crate::protocol::RepairAction;
use crate::sketch::{bezier_polyline, offset_label_anchor, sample_arc, spline_to_bezier};
use crate::state::{Mode, SketchModel, SketchSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Segment,
    /// Bezier control polygon
    Guide,
    /// Rubber band to the cursor
    Preview,
    Point,
    Anchor,
    Label,
    RepairDelete,
    RepairAdd,
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum DrawItem {
    Polyline { points: Vec<[f64; 2]>, style: Style },
    Marker { at: [f64; 2], style: Style },
    Label { at: [f64; 2], text: String, style: Style },
}

fn xy(p: Point) -> [f64; 2] {
    [p.x, p.y]
}

fn polyline(points: impl IntoIterator<Item = Point>, style: Style) -> DrawItem {
    DrawItem::Polyline {
        points: points.into_iter().map(xy).collect(),
        style,
    }
}

/// Segment geometry. Spline and Bezier runs are drawn as a whole.
fn segment_items(model: &SketchModel, subdivisions: usize, out: &mut Vec<DrawItem>) {
    for seg in &model.segments {
        let (a, b) = (model.point_pos(seg.begin), model.point_pos(seg.end));
        match seg.kind {
            SegmentKind::Line => out.push(polyline([a, b], Style::Segment)),
            SegmentKind::CircularArc => match &seg.arc {
                Some(arc) => out.push(polyline(sample_arc(arc, subdivisions), Style::Segment)),
                None => out.push(polyline([a, b], Style::Segment)),
            },
            SegmentKind::SplinePoint | SegmentKind::BezierPoint => {}
        }
    }

    for run in model.curve_runs() {
        let points = model.run_points(&run);
        match run.kind {
            SegmentKind::SplinePoint => {
                for piece in spline_to_bezier(&points) {
                    out.push(polyline(bezier_polyline(&piece, subdivisions), Style::Segment));
                }
            }
            SegmentKind::BezierPoint => {
                out.push(polyline(bezier_polyline(&points, subdivisions), Style::Segment));
                out.push(polyline(points, Style::Guide));
            }
            SegmentKind::Line | SegmentKind::CircularArc => {}
        }
    }
}

fn label_items(model: &SketchModel, out: &mut Vec<DrawItem>) {
    for (i, p) in model.points.iter().enumerate() {
        let style = if i == ANCHOR { Style::Anchor } else { Style::Point };
        out.push(DrawItem::Marker { at: p.pos(), style });
    }
    for p in model.points.iter().filter(|p| !p.label.is_empty()) {
        out.push(DrawItem::Label {
            at: p.pos(),
            text: p.label.clone(),
            style: Style::Label,
        });
    }
    for s in model.segments.iter().filter(|s| !s.label.is_empty()) {
        out.push(DrawItem::Label {
            at: [s.xm, s.ym],
            text: s.label.clone(),
            style: Style::Label,
        });
    }
    for c in &model.constraints {
        if let Some(at) = offset_label_anchor(c, &model.points) {
            out.push(DrawItem::Label {
                at: xy(at),
                text: format!("{}={}", c.kind, c.value),
                style: Style::Label,
            });
        }
    }
}

fn repair_items(session: &SketchSession, out: &mut Vec<DrawItem>) {
    let Some(hint) = session.repair_hint() else {
        return;
    };
    let model = session.model();
    let style = match hint.action {
        RepairAction::Delete => Style::RepairDelete,
        RepairAction::Add => Style::RepairAdd,
    };
    for item in &hint.items {
        let at = match item.target() {
            Some(ConstraintTarget::Point { index }) | Some(ConstraintTarget::ZeroLength { point: index, .. }) => {
                model.points.get(index).map(|p| p.pos())
            }
            Some(ConstraintTarget::Segment { index }) => {
                model.segments.get(index).map(|s| [s.xm, s.ym])
            }
            Some(target @ ConstraintTarget::Offset { .. }) => offset_label_anchor(
                &shared::Constraint::new(item.kind, target, ""),
                &model.points,
            )
            .map(xy),
            None => None,
        };
        match at {
            Some(at) => out.push(DrawItem::Label {
                at,
                text: item.kind.to_string(),
                style,
            }),
            None => tracing::warn!("Repair item {:?} does not match the sketch", item),
        }
    }
}

fn preview_items(session: &SketchSession, out: &mut Vec<DrawItem>) {
    let Some(cursor) = session.cursor() else {
        return;
    };
    let model = session.model();
    let from = match session.mode() {
        Mode::Drawing => model.last_point(),
        Mode::SettingWidth | Mode::SettingDepth => session.pending_offset().map(|p| p.base),
        _ => None,
    };
    if let Some(from) = from {
        out.push(polyline([model.point_pos(from), cursor], Style::Preview));
    }
}

/// Everything to paint for the session, in order.
pub fn draw_list(session: &SketchSession) -> Vec<DrawItem> {
    let settings = session.settings();
    let mut items = Vec::new();
    segment_items(session.model(), settings.curve_subdivisions, &mut items);
    preview_items(session, &mut items);
    label_items(session.model(), &mut items);
    repair_items(session, &mut items);
    items.push(DrawItem::Label {
        at: [8.0, settings.canvas.height - 8.0],
        text: crate::i18n::status_line(session),
        style: Style::Status,
    });
    items
}
