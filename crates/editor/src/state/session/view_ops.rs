//! View-only commands: hover, pan, zoom, fit, queries.
//! None of them is recorded for undo.

use kurbo::{Point, Vec2};
use serde::Serialize;

use super::{EntityKind, NearestEntity, Outcome, PanDirection, SketchSession, ZoomDirection};
use crate::error::{EditorError, EditorResult};
use crate::sketch::{closest_offset_constraint, closest_point, closest_segment};
use crate::state::{Mode, SketchModel};

#[derive(Serialize)]
struct ModelDump<'a> {
    mode: Mode,
    mode_code: u8,
    model: &'a SketchModel,
}

impl SketchSession {
    /// Record the cursor. While choosing curvature the arc follows it.
    pub fn hover(&mut self, at: Point) -> EditorResult<Outcome> {
        if self.mode == Mode::SettingCurvature {
            self.preview_curvature(at);
        } else {
            self.cursor = Some(at);
        }
        Ok(Outcome::ViewChanged)
    }

    fn require_view(&self, command: &'static str) -> EditorResult<()> {
        self.require_mode(command, |m| m.has_sketch())
    }

    pub fn pan(&mut self, direction: PanDirection) -> EditorResult<Outcome> {
        self.require_view("pan")?;
        let step = self.settings.pan_step;
        let offset = match direction {
            PanDirection::Left => Vec2::new(-step, 0.0),
            PanDirection::Right => Vec2::new(step, 0.0),
            PanDirection::Up => Vec2::new(0.0, -step),
            PanDirection::Down => Vec2::new(0.0, step),
        };
        self.model.transform_view(1.0, offset);
        self.notify_mutated();
        Ok(Outcome::ViewChanged)
    }

    /// Zoom about the canvas center.
    pub fn zoom(&mut self, direction: ZoomDirection) -> EditorResult<Outcome> {
        self.require_view("zoom")?;
        let factor = match direction {
            ZoomDirection::In => self.settings.zoom_factor,
            ZoomDirection::Out => 1.0 / self.settings.zoom_factor,
        };
        let [cx, cy] = self.settings.canvas.center();
        let center = Vec2::new(cx, cy);
        self.model.transform_view(factor, center * (1.0 - factor));
        self.notify_mutated();
        Ok(Outcome::ViewChanged)
    }

    pub fn rescale_to_fit(&mut self) -> EditorResult<Outcome> {
        self.require_view("rescale_to_fit")?;
        let canvas = self.settings.canvas;
        self.model
            .fit_view(canvas.width, canvas.height, self.settings.fit_margin);
        self.notify_mutated();
        Ok(Outcome::ViewChanged)
    }

    /// Nearest point, segment or offset label. Ties prefer points, then segments.
    pub fn query_nearest(&self, at: Point) -> EditorResult<NearestEntity> {
        let m = &self.model;
        let mut best: Option<NearestEntity> = closest_point(at, &m.points).map(|(i, d)| {
            NearestEntity {
                kind: EntityKind::Point,
                index: i,
                label: m.points[i].label.clone(),
                distance: d,
            }
        });
        let others = [
            closest_segment(at, &m.segments).map(|(i, d)| NearestEntity {
                kind: EntityKind::Segment,
                index: i,
                label: m.segments[i].label.clone(),
                distance: d,
            }),
            closest_offset_constraint(at, &m.constraints, &m.points).map(|(i, d)| {
                NearestEntity {
                    kind: EntityKind::Offset,
                    index: i,
                    label: m.constraints[i].kind.code().to_string(),
                    distance: d,
                }
            }),
        ];
        for candidate in others.into_iter().flatten() {
            if best
                .as_ref()
                .map_or(true, |b| candidate.distance < b.distance)
            {
                best = Some(candidate);
            }
        }
        best.ok_or(EditorError::NothingNearby)
    }

    /// Pretty JSON of mode and model, also logged at debug level.
    pub fn dump_model(&self) -> String {
        let dump = ModelDump {
            mode: self.mode,
            mode_code: self.mode.code(),
            model: &self.model,
        };
        let json = serde_json::to_string_pretty(&dump).unwrap_or_default();
        tracing::debug!("Model dump:\n{json}");
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::SegmentKind;

    fn square() -> SketchSession {
        let mut s = SketchSession::default();
        s.begin(Some(Point::new(300.0, 200.0))).unwrap();
        s.append(SegmentKind::Line, Point::new(500.0, 200.0)).unwrap();
        s.append(SegmentKind::Line, Point::new(500.0, 400.0)).unwrap();
        s.append(SegmentKind::Line, Point::new(300.0, 400.0)).unwrap();
        s.close_sketch().unwrap();
        s
    }

    #[test]
    fn test_pan_moves_points_not_undo() {
        let mut s = square();
        let depth = s.undo_depth();
        s.pan(PanDirection::Right).unwrap();
        assert_eq!(s.model().points[0].x, 350.0);
        s.pan(PanDirection::Up).unwrap();
        assert_eq!(s.model().points[0].y, 150.0);
        assert_eq!(s.undo_depth(), depth);
    }

    #[test]
    fn test_zoom_about_center() {
        let mut s = square();
        s.zoom(ZoomDirection::In).unwrap();
        // (300,200) relative to (400,300) is (-100,-100), scaled by 1.25
        assert_relative_eq!(s.model().points[0].x, 275.0);
        assert_relative_eq!(s.model().points[0].y, 175.0);
        s.zoom(ZoomDirection::Out).unwrap();
        assert_relative_eq!(s.model().points[0].x, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_view_commands_need_sketch() {
        let mut s = SketchSession::default();
        assert!(matches!(
            s.pan(PanDirection::Left),
            Err(EditorError::WrongMode { command: "pan", .. })
        ));
    }

    #[test]
    fn test_rescale_to_fit() {
        let mut s = square();
        s.rescale_to_fit().unwrap();
        let bbox = s.model().bounding_box().unwrap();
        assert_relative_eq!(bbox.height(), 480.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.center().x, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_query_nearest() {
        let s = square();
        let hit = s.query_nearest(Point::new(305.0, 198.0)).unwrap();
        assert_eq!(hit.kind, EntityKind::Point);
        assert_eq!(hit.index, 0);
        assert_eq!(hit.label, "XY");
        assert_eq!(hit.distance, 7.0);

        let hit = s.query_nearest(Point::new(400.0, 205.0)).unwrap();
        assert_eq!(hit.kind, EntityKind::Segment);
        assert_eq!(hit.index, 0);
        assert!(SketchSession::default()
            .query_nearest(Point::ZERO)
            .is_err());
    }

    #[test]
    fn test_dump_model_is_json() {
        let s = square();
        let json = s.dump_model();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "constraining");
        assert_eq!(value["mode_code"], 3);
        assert_eq!(value["model"]["points"].as_array().unwrap().len(), 4);
    }
}
