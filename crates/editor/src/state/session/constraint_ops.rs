//! Setting, editing and deleting constraints

use kurbo::Point;
use shared::{check_expression, Constraint, ConstraintKind, ConstraintTarget, TargetClass};

use super::{Outcome, SketchSession};
use crate::error::{EditorError, EditorResult};
use crate::sketch::{closest_offset_constraint, closest_point, closest_segment, nearest_by};
use crate::state::{Mode, PendingOffset};

/// Characters that would break the pipe/semicolon wire format
const RESERVED_CHARS: [char; 2] = ['|', ';'];

/// Validate a user value for `kind`; valueless kinds always store "0".
pub(crate) fn validate_value(kind: ConstraintKind, value: Option<&str>) -> EditorResult<String> {
    if !kind.has_value() {
        return Ok("0".to_string());
    }
    let text = value.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(EditorError::ValueRequired(kind));
    }
    let invalid = |reason: &str| EditorError::InvalidValue {
        value: text.to_string(),
        reason: reason.to_string(),
    };
    if !text.is_ascii() || text.contains(RESERVED_CHARS) {
        return Err(invalid("only ASCII without '|' or ';' is allowed"));
    }
    check_expression(text).map_err(|e| invalid(&e.to_string()))?;
    if let Some(v) = shared::numeric_value(text) {
        match kind {
            ConstraintKind::Length if v <= 0.0 => return Err(invalid("length must be positive")),
            ConstraintKind::Radius if v == 0.0 => return Err(invalid("radius must not be zero")),
            _ => {}
        }
    }
    Ok(text.to_string())
}

fn describe(target: &ConstraintTarget) -> String {
    match *target {
        ConstraintTarget::Point { index } => format!("point {}", index + 1),
        ConstraintTarget::Segment { index } => format!("segment {}", index + 1),
        ConstraintTarget::Offset { base, target } => {
            format!("points {} and {}", base + 1, target + 1)
        }
        ConstraintTarget::ZeroLength { point, .. } => format!("point {}", point + 1),
    }
}

/// Which entity a delete request landed on
enum DeleteCandidate {
    Point(usize),
    Segment(usize),
    Offset(usize),
}

impl SketchSession {
    fn require_constraint_edit(&self, command: &'static str) -> EditorResult<()> {
        self.require_mode(command, |m| m.accepts_constraints())?;
        self.require_no_pending_solve()
    }

    /// Nearest point within the pick tolerance
    fn pick_point(&self, at: Point) -> EditorResult<usize> {
        closest_point(at, &self.model.points)
            .filter(|&(_, d)| d <= self.settings.pick_tolerance)
            .map(|(i, _)| i)
            .ok_or(EditorError::NothingNearby)
    }

    /// Nearest segment midpoint within the pick tolerance
    fn pick_segment(&self, at: Point) -> EditorResult<usize> {
        closest_segment(at, &self.model.segments)
            .filter(|&(_, d)| d <= self.settings.pick_tolerance)
            .map(|(i, _)| i)
            .ok_or(EditorError::NothingNearby)
    }

    /// Eligibility of the picked entity for `kind`.
    fn constraint_target(&self, kind: ConstraintKind, at: Point) -> EditorResult<ConstraintTarget> {
        let not_applicable = |reason: &str| EditorError::NotApplicable {
            kind,
            reason: reason.to_string(),
        };
        match kind.target_class() {
            TargetClass::Point => {
                let index = self.pick_point(at)?;
                let joins_two = self.model.incoming_segment(index).is_some()
                    && self.model.outgoing_segment(index).is_some();
                let needs_join = matches!(
                    kind,
                    ConstraintKind::Perpendicular | ConstraintKind::Tangent | ConstraintKind::Angle
                );
                if needs_join && !joins_two {
                    return Err(not_applicable("a point that does not join two segments"));
                }
                Ok(ConstraintTarget::Point { index })
            }
            TargetClass::Segment => {
                let index = self.pick_segment(at)?;
                if self.model.is_zero_length_segment(index) {
                    return Err(not_applicable("a zero-length segment"));
                }
                let is_arc = self.model.segments[index].is_arc();
                let wants_arc = matches!(kind, ConstraintKind::Radius | ConstraintKind::Sweep);
                if wants_arc && !is_arc {
                    return Err(not_applicable("a segment that is not an arc"));
                }
                if !wants_arc && is_arc {
                    return Err(not_applicable("an arc"));
                }
                Ok(ConstraintTarget::Segment { index })
            }
            TargetClass::Offset | TargetClass::Internal => {
                Err(not_applicable("a single point or segment"))
            }
        }
    }

    /// Add a constraint at the entity nearest to `at`, or edit the value of an existing one.
    pub fn set_constraint(
        &mut self,
        kind: ConstraintKind,
        at: Point,
        value: Option<String>,
    ) -> EditorResult<Outcome> {
        self.require_constraint_edit("set_constraint")?;
        if kind == ConstraintKind::ZeroLength {
            return Err(EditorError::NotApplicable {
                kind,
                reason: "any entity: it is managed by the editor".to_string(),
            });
        }
        let value = validate_value(kind, value.as_deref())?;
        if kind.target_class() == TargetClass::Offset {
            return self.begin_offset(kind, at, value);
        }

        let target = self.constraint_target(kind, at)?;
        if let Some(existing) = self.model.find_constraint(kind, target) {
            if !kind.has_value() {
                return Err(EditorError::ConstraintExists {
                    kind,
                    entity: describe(&target),
                });
            }
            return Ok(self.edit_value(existing, value));
        }
        if let Some(&conflict) = kind
            .conflicts_with()
            .iter()
            .find(|other| self.model.find_constraint(**other, target).is_some())
        {
            return Err(EditorError::ConflictingConstraint {
                requested: kind,
                existing: conflict,
            });
        }

        self.save_undo();
        self.model.push_constraint(Constraint::new(kind, target, value));
        self.after_constraint_change();
        tracing::debug!("Constraint {kind} added on {}", describe(&target));
        Ok(Outcome::Updated)
    }

    fn edit_value(&mut self, index: usize, value: String) -> Outcome {
        self.save_undo();
        self.model.constraints[index].value = value;
        self.after_constraint_change();
        Outcome::Updated
    }

    fn after_constraint_change(&mut self) {
        if self.model.derive_calibration() {
            tracing::info!("Calibration updated: {:?}", self.model.calibration);
        }
        self.repair = None;
        self.mode = Mode::Constraining;
        self.notify_mutated();
    }

    /// First half of W/D: edit the label under the cursor, or remember the base point.
    fn begin_offset(
        &mut self,
        kind: ConstraintKind,
        at: Point,
        value: String,
    ) -> EditorResult<Outcome> {
        let label = nearest_by(
            at,
            self.model
                .constraints
                .iter()
                .enumerate()
                .filter(|(_, c)| c.kind == kind)
                .filter_map(|(i, c)| {
                    crate::sketch::offset_label_anchor(c, &self.model.points).map(|p| (i, p))
                }),
        );
        let point = closest_point(at, &self.model.points);
        if let Some((index, label_dist)) = label {
            let nearer = point.map_or(true, |(_, d)| label_dist < d);
            if nearer && label_dist <= self.settings.pick_tolerance {
                return Ok(self.edit_value(index, value));
            }
        }

        let base = self.pick_point(at)?;
        // the snapshot covers the whole two-step command
        self.save_undo();
        self.pending_offset = Some(PendingOffset {
            kind,
            base,
            value,
            resume: self.mode,
        });
        self.mode = Mode::for_offset(kind);
        self.cursor = None;
        Ok(Outcome::Updated)
    }

    /// Second half of W/D. Failures drop the pending constraint.
    pub(crate) fn complete_offset(&mut self, cursor: Option<Point>) -> EditorResult<Outcome> {
        let pending = self.pending_offset.take();
        self.mode = Mode::Constraining;
        self.cursor = None;

        let resolved = pending
            .ok_or(EditorError::NothingNearby)
            .and_then(|p| {
                let at = cursor.ok_or(EditorError::NothingNearby)?;
                let target = self.pick_point(at)?;
                if target == p.base {
                    return Err(EditorError::SameOffsetPoint);
                }
                Ok((p, target))
            });
        let (pending, target) = match resolved {
            Ok(found) => found,
            Err(e) => {
                // nothing was built: drop the snapshot taken with the base point
                self.undo.undo();
                return Err(e);
            }
        };

        let target = ConstraintTarget::Offset {
            base: pending.base,
            target,
        };
        match self.model.find_constraint(pending.kind, target) {
            Some(existing) => self.model.constraints[existing].value = pending.value,
            None => {
                self.model
                    .push_constraint(Constraint::new(pending.kind, target, pending.value));
            }
        }
        self.after_constraint_change();
        tracing::debug!("Constraint {} set on {}", pending.kind, describe(&target));
        Ok(Outcome::Updated)
    }

    fn delete_candidate(&self, at: Point) -> Option<DeleteCandidate> {
        let m = &self.model;
        let point = nearest_by(
            at,
            m.points
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.label.is_empty())
                .map(|(i, p)| (i, Point::new(p.x, p.y))),
        );
        let segment = nearest_by(
            at,
            m.segments
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.label.is_empty())
                .map(|(i, s)| (i, Point::new(s.xm, s.ym))),
        );
        let offset = closest_offset_constraint(at, &m.constraints, &m.points);

        // strict comparisons keep the point > segment > offset preference on ties
        let mut best: Option<(DeleteCandidate, f64)> = point.map(|(i, d)| (DeleteCandidate::Point(i), d));
        if let Some((i, d)) = segment {
            if best.as_ref().map_or(true, |(_, bd)| d < *bd) {
                best = Some((DeleteCandidate::Segment(i), d));
            }
        }
        if let Some((i, d)) = offset {
            if best.as_ref().map_or(true, |(_, bd)| d < *bd) {
                best = Some((DeleteCandidate::Offset(i), d));
            }
        }
        best.filter(|(_, d)| *d <= self.settings.pick_tolerance)
            .map(|(c, _)| c)
    }

    /// Delete one constraint from the entity nearest to `at`.
    ///
    /// With several constraints on the entity, `kind` must say which one.
    pub fn delete_constraint(
        &mut self,
        at: Point,
        kind: Option<ConstraintKind>,
    ) -> EditorResult<Outcome> {
        self.require_constraint_edit("delete_constraint")?;
        let candidates = match self.delete_candidate(at) {
            Some(DeleteCandidate::Point(i)) => self.model.constraints_on_point(i),
            Some(DeleteCandidate::Segment(i)) => self.model.constraints_on_segment(i),
            Some(DeleteCandidate::Offset(i)) => vec![i],
            None => return Err(EditorError::NoConstraintHere),
        };
        let constraints = &self.model.constraints;
        let deletable: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| constraints[i].kind != ConstraintKind::ZeroLength)
            .collect();
        if deletable.is_empty() {
            return Err(if candidates.is_empty() {
                EditorError::NoConstraintHere
            } else {
                EditorError::ZeroLengthLocked
            });
        }

        let index = match kind {
            Some(ConstraintKind::ZeroLength) => return Err(EditorError::ZeroLengthLocked),
            Some(k) => deletable
                .iter()
                .copied()
                .find(|&i| constraints[i].kind == k)
                .ok_or(EditorError::NoSuchConstraint(k))?,
            None if deletable.len() == 1 => deletable[0],
            None => {
                return Err(EditorError::AmbiguousDeletion {
                    codes: deletable.iter().map(|&i| constraints[i].kind.code()).collect(),
                })
            }
        };

        self.save_undo();
        let removed = self.model.remove_constraint(index);
        self.repair = None;
        self.mode = Mode::Constraining;
        self.notify_mutated();
        tracing::debug!(
            "Constraint {} removed from {}",
            removed.kind,
            describe(&removed.target)
        );
        Ok(Outcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SketchSession;
    use shared::SegmentKind;

    /// Closed triangle (100,100) → (200,100) → (200,200) → anchor
    fn constraining() -> SketchSession {
        let mut s = SketchSession::default();
        s.begin(Some(Point::new(100.0, 100.0))).unwrap();
        s.append(SegmentKind::Line, Point::new(200.0, 100.0)).unwrap();
        s.append(SegmentKind::Line, Point::new(200.0, 200.0)).unwrap();
        s.close_sketch().unwrap();
        s
    }

    // --- Values ---

    #[test]
    fn test_validate_value() {
        assert_eq!(validate_value(ConstraintKind::Horizontal, None), Ok("0".to_string()));
        assert_eq!(
            validate_value(ConstraintKind::Length, Some("  ")),
            Err(EditorError::ValueRequired(ConstraintKind::Length))
        );
        assert!(validate_value(ConstraintKind::Length, Some("-2")).is_err());
        assert!(validate_value(ConstraintKind::Radius, Some("0")).is_err());
        assert!(validate_value(ConstraintKind::Radius, Some("-2")).is_ok());
        assert!(validate_value(ConstraintKind::X, Some("a|b")).is_err());
        assert!(validate_value(ConstraintKind::X, Some("2 +")).is_err());
        assert_eq!(
            validate_value(ConstraintKind::Length, Some(" width * 2 ")),
            Ok("width * 2".to_string())
        );
    }

    // --- Set ---

    #[test]
    fn test_set_segment_constraint() {
        let mut s = constraining();
        s.set_constraint(ConstraintKind::Horizontal, Point::new(150.0, 102.0), None)
            .unwrap();
        assert_eq!(s.model().segments[0].label, "H");
        assert_eq!(
            s.set_constraint(ConstraintKind::Horizontal, Point::new(150.0, 102.0), None),
            Err(EditorError::ConstraintExists {
                kind: ConstraintKind::Horizontal,
                entity: "segment 1".to_string()
            })
        );
        assert_eq!(
            s.set_constraint(ConstraintKind::Vertical, Point::new(150.0, 102.0), None),
            Err(EditorError::ConflictingConstraint {
                requested: ConstraintKind::Vertical,
                existing: ConstraintKind::Horizontal
            })
        );
    }

    #[test]
    fn test_edit_existing_value() {
        let mut s = constraining();
        s.set_constraint(ConstraintKind::X, Point::new(100.0, 100.0), Some("3".into()))
            .unwrap();
        assert_eq!(s.model().constraints[0].value, "3");
        assert_eq!(s.model().constraint_count(), 2);
    }

    #[test]
    fn test_nothing_nearby() {
        let mut s = constraining();
        assert_eq!(
            s.set_constraint(ConstraintKind::Length, Point::new(600.0, 600.0), Some("5".into())),
            Err(EditorError::NothingNearby)
        );
    }

    #[test]
    fn test_radius_needs_arc() {
        let mut s = constraining();
        assert!(matches!(
            s.set_constraint(ConstraintKind::Radius, Point::new(150.0, 100.0), Some("5".into())),
            Err(EditorError::NotApplicable { kind: ConstraintKind::Radius, .. })
        ));
    }

    #[test]
    fn test_zero_length_not_user_creatable() {
        let mut s = constraining();
        assert!(matches!(
            s.set_constraint(ConstraintKind::ZeroLength, Point::new(100.0, 100.0), None),
            Err(EditorError::NotApplicable { .. })
        ));
    }

    #[test]
    fn test_rejected_in_drawing_mode() {
        let mut s = SketchSession::default();
        s.begin(None).unwrap();
        assert!(matches!(
            s.set_constraint(ConstraintKind::Horizontal, Point::new(400.0, 300.0), None),
            Err(EditorError::WrongMode { .. })
        ));
    }

    // --- Offsets ---

    #[test]
    fn test_width_two_step() {
        let mut s = constraining();
        s.set_constraint(ConstraintKind::Width, Point::new(100.0, 100.0), Some("10".into()))
            .unwrap();
        assert_eq!(s.mode(), Mode::SettingWidth);
        s.complete_offset(Some(Point::new(199.0, 199.0))).unwrap();
        assert_eq!(s.mode(), Mode::Constraining);
        let c = s.model().constraints.last().unwrap();
        assert_eq!(c.target, ConstraintTarget::Offset { base: 0, target: 2 });
        assert_eq!(c.value, "10");
    }

    #[test]
    fn test_offset_same_point_discards() {
        let mut s = constraining();
        let before = s.model().clone();
        let depth_before = s.undo_depth();
        s.set_constraint(ConstraintKind::Depth, Point::new(100.0, 100.0), Some("4".into()))
            .unwrap();
        assert_eq!(
            s.complete_offset(Some(Point::new(101.0, 101.0))),
            Err(EditorError::SameOffsetPoint)
        );
        assert_eq!(s.mode(), Mode::Constraining);
        assert_eq!(s.model(), &before);
        assert_eq!(s.undo_depth(), depth_before);
    }

    #[test]
    fn test_offset_label_edit() {
        let mut s = constraining();
        s.set_constraint(ConstraintKind::Width, Point::new(100.0, 100.0), Some("10".into()))
            .unwrap();
        s.complete_offset(Some(Point::new(200.0, 200.0))).unwrap();
        // W label sits at ((100+200)/2, 100) = (150, 100)
        s.set_constraint(ConstraintKind::Width, Point::new(150.0, 95.0), Some("12".into()))
            .unwrap();
        assert_eq!(s.mode(), Mode::Constraining);
        assert_eq!(s.model().constraints.last().unwrap().value, "12");
    }

    // --- Delete ---

    #[test]
    fn test_delete_needs_kind_on_xy() {
        let mut s = constraining();
        assert_eq!(
            s.delete_constraint(Point::new(100.0, 100.0), None),
            Err(EditorError::AmbiguousDeletion {
                codes: "XY".to_string()
            })
        );
        assert_eq!(
            s.delete_constraint(Point::new(100.0, 100.0), Some(ConstraintKind::Length)),
            Err(EditorError::NoSuchConstraint(ConstraintKind::Length))
        );
        s.delete_constraint(Point::new(100.0, 100.0), Some(ConstraintKind::X))
            .unwrap();
        assert_eq!(s.model().points[0].label, "Y");
    }

    #[test]
    fn test_delete_nothing_here() {
        let mut s = constraining();
        assert_eq!(
            s.delete_constraint(Point::new(200.0, 200.0), None),
            Err(EditorError::NoConstraintHere)
        );
    }
}
