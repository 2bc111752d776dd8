//! Arc geometry from endpoints + bulge, using the kurbo library

use kurbo::{Point, Vec2};
use shared::ArcGeometry;

/// Bulge magnitudes below this are treated as straight.
pub const MIN_DIP: f64 = 1e-6;

/// Chords shorter than this cannot carry an arc.
pub const MIN_CHORD: f64 = 1e-9;

// ============================================================================
// Kurbo helpers
// ============================================================================

/// Convert array to kurbo Point
pub fn to_point(p: [f64; 2]) -> Point {
    Point::new(p[0], p[1])
}

/// Unit normal pointing to the visual left of A→B on a y-down screen.
pub fn left_normal(a: Point, b: Point) -> Option<Vec2> {
    let d = b - a;
    let len = d.hypot();
    if len < MIN_CHORD {
        return None;
    }
    Some(Vec2::new(d.y / len, -d.x / len))
}

// ============================================================================
// Bulge <-> circle
// ============================================================================

/// Circle through `a` and `b` whose arc midpoint sits `dip` along the left normal.
///
/// Returns `None` for degenerate input (tiny bulge, tiny chord, or a singular
/// radius). Callers treat that as a straight segment.
pub fn arc_from_bulge(a: Point, b: Point, dip: f64) -> Option<ArcGeometry> {
    if !dip.is_finite() || dip.abs() < MIN_DIP {
        return None;
    }
    let n = left_normal(a, b)?;
    let half = (b - a).hypot() / 2.0;
    let radius = (half * half + dip * dip) / (2.0 * dip);
    if !radius.is_finite() {
        return None;
    }
    let center = a.midpoint(b) + n * (dip - radius);
    Some(ArcGeometry {
        xc: center.x,
        yc: center.y,
        radius,
        angle_beg: (a.y - center.y).atan2(a.x - center.x),
        angle_end: (b.y - center.y).atan2(b.x - center.x),
    })
}

/// Bulge of the arc from `a` to `b` around `center`.
///
/// `left` selects the arc lying on the left side of A→B.
pub fn bulge_from_center(a: Point, b: Point, center: Point, left: bool) -> f64 {
    let Some(n) = left_normal(a, b) else {
        return 0.0;
    };
    let offset = (center - a.midpoint(b)).dot(n);
    let r = (a - center).hypot();
    if left {
        offset + r
    } else {
        offset - r
    }
}

/// Signed distance of `cursor` from the chord A→B, positive on the left.
pub fn dip_from_cursor(a: Point, b: Point, cursor: Point) -> f64 {
    match left_normal(a, b) {
        Some(n) => (cursor - a.midpoint(b)).dot(n),
        None => 0.0,
    }
}

/// Point on the arc halfway between its ends (or the chord midpoint when straight).
pub fn arc_midpoint(a: Point, b: Point, dip: f64) -> Point {
    match left_normal(a, b) {
        Some(n) => a.midpoint(b) + n * dip,
        None => a.midpoint(b),
    }
}

/// Sample `n + 1` points along an arc, start to end.
pub fn sample_arc(arc: &ArcGeometry, n: usize) -> Vec<Point> {
    let n = n.max(1);
    let r = arc.radius.abs();
    let sweep = arc.sweep();
    (0..=n)
        .map(|i| {
            let angle = arc.angle_beg + sweep * i as f64 / n as f64;
            Point::new(arc.xc + r * angle.cos(), arc.yc + r * angle.sin())
        })
        .collect()
}
