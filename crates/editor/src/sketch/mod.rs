//! Geometry kernel: pure functions over screen-space points

pub mod curves;
pub mod geometry;
pub mod picking;

pub use curves::{bezier_polyline, eval_bezier, spline_polyline, spline_to_bezier};
pub use geometry::{
    arc_from_bulge, arc_midpoint, bulge_from_center, dip_from_cursor, sample_arc, to_point,
};
pub use picking::{
    closest_offset_constraint, closest_point, closest_segment, manhattan, nearest_by,
    offset_label_anchor, offset_label_position,
};
