//! Bezier evaluation and cubic spline → Bezier conversion

use kurbo::{Point, Vec2};

/// Evaluate a Bezier curve of any degree at `t` (de Casteljau, in place).
pub fn eval_bezier(control: &[Point], t: f64) -> Point {
    match control.len() {
        0 => Point::ZERO,
        1 => control[0],
        n => {
            let mut work: Vec<Point> = control.to_vec();
            for level in 1..n {
                for i in 0..n - level {
                    work[i] = work[i].lerp(work[i + 1], t);
                }
            }
            work[0]
        }
    }
}

/// Fixed number of samples along a Bezier run, regardless of its degree.
pub fn bezier_polyline(control: &[Point], subdivisions: usize) -> Vec<Point> {
    if control.len() < 2 {
        return control.to_vec();
    }
    let n = subdivisions.max(1);
    (0..=n)
        .map(|i| eval_bezier(control, i as f64 / n as f64))
        .collect()
}

/// Convert an interpolating natural cubic spline through `points` into cubic Bezier pieces.
///
/// Piece `i` runs from `points[i]` to `points[i + 1]`. The interior control points
/// come from a tridiagonal system solved by forward elimination and back substitution.
pub fn spline_to_bezier(points: &[Point]) -> Vec<[Point; 4]> {
    let n = points.len().saturating_sub(1);
    match n {
        0 => return Vec::new(),
        1 => {
            let (p0, p3) = (points[0], points[1]);
            let d = p3 - p0;
            return vec![[p0, p0 + d / 3.0, p0 + d * (2.0 / 3.0), p3]];
        }
        _ => {}
    }

    let k: Vec<Vec2> = points.iter().map(|p| p.to_vec2()).collect();

    // Rows: a[i] * c1[i-1] + b[i] * c1[i] + c[i] * c1[i+1] = r[i]
    let mut a = vec![0.0; n];
    let mut b = vec![0.0; n];
    let mut c = vec![0.0; n];
    let mut r = vec![Vec2::ZERO; n];

    b[0] = 2.0;
    c[0] = 1.0;
    r[0] = k[0] + k[1] * 2.0;
    for i in 1..n - 1 {
        a[i] = 1.0;
        b[i] = 4.0;
        c[i] = 1.0;
        r[i] = k[i] * 4.0 + k[i + 1] * 2.0;
    }
    a[n - 1] = 2.0;
    b[n - 1] = 7.0;
    r[n - 1] = k[n - 1] * 8.0 + k[n];

    // Forward elimination
    for i in 1..n {
        let m = a[i] / b[i - 1];
        b[i] -= m * c[i - 1];
        let prev = r[i - 1];
        r[i] -= prev * m;
    }

    // Back substitution
    let mut c1 = vec![Vec2::ZERO; n];
    c1[n - 1] = r[n - 1] / b[n - 1];
    for i in (0..n - 1).rev() {
        c1[i] = (r[i] - c1[i + 1] * c[i]) / b[i];
    }

    let mut c2 = vec![Vec2::ZERO; n];
    for i in 0..n - 1 {
        c2[i] = k[i + 1] * 2.0 - c1[i + 1];
    }
    c2[n - 1] = (k[n] + c1[n - 1]) / 2.0;

    (0..n)
        .map(|i| {
            [
                points[i],
                c1[i].to_point(),
                c2[i].to_point(),
                points[i + 1],
            ]
        })
        .collect()
}

/// Polyline through a spline run, `subdivisions` samples per piece.
pub fn spline_polyline(points: &[Point], subdivisions: usize) -> Vec<Point> {
    let pieces = spline_to_bezier(points);
    if pieces.is_empty() {
        return points.to_vec();
    }
    let n = subdivisions.max(1);
    let mut out = vec![points[0]];
    for piece in &pieces {
        for i in 1..=n {
            out.push(eval_bezier(piece, i as f64 / n as f64));
        }
    }
    out
}
