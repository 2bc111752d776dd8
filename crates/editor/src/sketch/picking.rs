//! Hit-testing by Manhattan distance in screen space

use kurbo::Point;
use shared::{Constraint, ConstraintKind, ConstraintTarget, Segment, SketchPoint};

/// |Δx| + |Δy|
pub fn manhattan(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Nearest candidate by Manhattan distance. Ties keep the first candidate.
pub fn nearest_by<I>(cursor: Point, candidates: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = (usize, Point)>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, anchor) in candidates {
        let dist = manhattan(cursor, anchor);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((index, dist)),
        }
    }
    best
}

pub fn closest_point(cursor: Point, points: &[SketchPoint]) -> Option<(usize, f64)> {
    nearest_by(
        cursor,
        points.iter().enumerate().map(|(i, p)| (i, Point::new(p.x, p.y))),
    )
}

/// Segments are picked by their (derived) midpoint.
pub fn closest_segment(cursor: Point, segments: &[Segment]) -> Option<(usize, f64)> {
    nearest_by(
        cursor,
        segments
            .iter()
            .enumerate()
            .map(|(i, s)| (i, Point::new(s.xm, s.ym))),
    )
}

/// Nearest W/D constraint label, returned as an index into `constraints`.
pub fn closest_offset_constraint(
    cursor: Point,
    constraints: &[Constraint],
    points: &[SketchPoint],
) -> Option<(usize, f64)> {
    nearest_by(
        cursor,
        constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| offset_label_anchor(c, points).map(|p| (i, p))),
    )
}

/// Where the label of a W/D constraint is drawn.
pub fn offset_label_position(kind: ConstraintKind, base: Point, target: Point) -> Point {
    match kind {
        ConstraintKind::Depth => Point::new(base.x, (base.y + target.y) / 2.0),
        _ => Point::new((base.x + target.x) / 2.0, base.y),
    }
}

pub fn offset_label_anchor(constraint: &Constraint, points: &[SketchPoint]) -> Option<Point> {
    match constraint.target {
        ConstraintTarget::Offset { base, target } => {
            let b = points.get(base)?;
            let t = points.get(target)?;
            Some(offset_label_position(
                constraint.kind,
                Point::new(b.x, b.y),
                Point::new(t.x, t.y),
            ))
        }
        _ => None,
    }
}
