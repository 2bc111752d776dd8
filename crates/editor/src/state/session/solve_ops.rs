//! Solve round trip and save

use uuid::Uuid;

use super::{Outcome, PendingSolve, SketchSession, SolveTicket};
use crate::error::{EditorError, EditorResult};
use crate::protocol::{
    build_save_chunks, build_save_payload, build_solve_request, interpret_solve_response,
    SolveOutcome,
};
use crate::state::{Mode, SolvePolicy};

impl SketchSession {
    /// Build the solve message and occupy the pending slot.
    ///
    /// Missing calibration is completed with a canvas-based guess that stays in the model.
    pub fn request_solve(&mut self, force: bool) -> EditorResult<SolveTicket> {
        self.require_mode("solve", |m| m.accepts_constraints())?;
        self.require_no_pending_solve()?;

        if !self.model.is_fully_constrained() {
            let allowed = force && self.settings.solve_policy == SolvePolicy::AllowOverride;
            if !allowed {
                return Err(EditorError::NotFullyConstrained {
                    variables: self.model.degrees_of_freedom(),
                    constraints: self.model.constraint_count(),
                });
            }
            tracing::warn!(
                "Forcing solve with {} variables and {} constraints",
                self.model.degrees_of_freedom(),
                self.model.constraint_count()
            );
        }

        if !self.model.calibration.is_complete() {
            self.save_undo();
            let canvas = self.settings.canvas;
            let guessed = self.model.fallback_calibration(canvas.width, canvas.height);
            tracing::warn!("Calibration guessed for {guessed:?}");
            self.notify_mutated();
        }

        let message = build_solve_request(&self.model)?;
        let request_id = Uuid::new_v4();
        self.pending_solve = Some(PendingSolve {
            request_id,
            point_count: self.model.points.len(),
        });
        tracing::info!("Solve request {request_id} sent ({} bytes)", message.len());
        Ok(SolveTicket {
            request_id,
            message,
        })
    }

    /// Apply the solver's answer to the pending request.
    pub fn receive_solve_response(&mut self, message: &str) -> EditorResult<Outcome> {
        let pending = self.pending_solve.take().ok_or(EditorError::NoPendingSolve)?;
        match interpret_solve_response(message, pending.point_count)? {
            SolveOutcome::Success(values) => {
                self.apply_solution(&values)?;
                tracing::info!("Solve {} applied", pending.request_id);
                Ok(Outcome::Solved)
            }
            SolveOutcome::Repair(hint) => {
                tracing::info!(
                    "Solver suggests {:?} of {} constraint(s)",
                    hint.action,
                    hint.items.len()
                );
                self.repair = Some(hint.clone());
                self.mode = Mode::Constraining;
                self.notify_mutated();
                Ok(Outcome::RepairSuggested(hint))
            }
            SolveOutcome::Failure(text) => Err(EditorError::SolverReported(text)),
        }
    }

    /// Release the pending slot after a transport failure.
    pub fn fail_pending_solve(&mut self, reason: &str) -> EditorResult<()> {
        let pending = self.pending_solve.take().ok_or(EditorError::NoPendingSolve)?;
        tracing::error!("Solve {} failed: {reason}", pending.request_id);
        Ok(())
    }

    fn apply_solution(&mut self, values: &[[f64; 3]]) -> EditorResult<()> {
        let cal = self.model.calibration;
        let scale = cal.scale.ok_or_else(|| EditorError::CalibrationIncomplete {
            missing: cal.missing(),
        })?;

        self.save_undo();
        for (i, [x, y, bulge]) in values.iter().copied().enumerate() {
            let Some([sx, sy]) = cal.to_screen(x, y) else {
                continue;
            };
            if let Some(p) = self.model.points.get_mut(i) {
                p.x = sx;
                p.y = sy;
            }
            if let Some(seg) = self.model.incoming_segment(i) {
                if self.model.segments[seg].is_arc() {
                    self.model.segments[seg].dip = bulge / scale;
                }
            }
        }
        self.model.refresh();
        self.repair = None;
        self.mode = Mode::Solved;
        self.notify_mutated();
        Ok(())
    }

    /// Serialize the sketch for the host and close the session.
    pub fn save(&mut self, confirm_unsolved: bool) -> EditorResult<Vec<String>> {
        self.require_mode("save", |m| m != Mode::Initializing)?;
        self.require_no_pending_solve()?;
        let missing = self.model.calibration.missing();
        if !missing.is_empty() {
            return Err(EditorError::CalibrationIncomplete { missing });
        }
        if self.resume_mode() != Mode::Solved && !confirm_unsolved {
            return Err(EditorError::UnsolvedSave);
        }

        let payload = build_save_payload(&self.branch, &self.model)?;
        let chunks = build_save_chunks(&payload);
        self.leave_sub_mode();
        self.closed = true;
        tracing::info!(
            "Sketch saved to branch '{}' in {} chunk(s)",
            self.branch,
            chunks.len()
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kurbo::Point;
    use shared::{Calibration, ConstraintKind, SegmentKind};

    /// Triangle with X, Y on the anchor and L=5 on the 100 px first side
    fn calibrated_triangle() -> SketchSession {
        let mut s = SketchSession::default();
        s.begin(Some(Point::new(100.0, 100.0))).unwrap();
        s.append(SegmentKind::Line, Point::new(200.0, 100.0)).unwrap();
        s.append(SegmentKind::Line, Point::new(200.0, 200.0)).unwrap();
        s.close_sketch().unwrap();
        s.set_constraint(ConstraintKind::Length, Point::new(150.0, 100.0), Some("5".into()))
            .unwrap();
        s
    }

    #[test]
    fn test_unbalanced_solve_blocked() {
        let mut s = calibrated_triangle();
        assert_eq!(
            s.request_solve(true),
            Err(EditorError::NotFullyConstrained {
                variables: 6,
                constraints: 3
            })
        );
        assert!(!s.is_solve_pending());
    }

    #[test]
    fn test_override_needs_force() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        assert!(s.request_solve(false).is_err());
        let ticket = s.request_solve(true).unwrap();
        assert!(ticket.message.starts_with("solveSketch|0.000000;0.000000;0.000000;"));
        assert_eq!(s.pending_request_id(), Some(ticket.request_id));
        assert_eq!(s.request_solve(true), Err(EditorError::SolveInFlight));
    }

    #[test]
    fn test_success_moves_points_and_solves() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        s.request_solve(true).unwrap();
        let outcome = s
            .receive_solve_response("solveSketch|0;0;0;6;0;0;6;-6;0;|")
            .unwrap();
        assert_eq!(outcome, Outcome::Solved);
        assert_eq!(s.mode(), Mode::Solved);
        // 6 units at 0.05 per px is 120 px
        assert_relative_eq!(s.model().points[1].x, 220.0, epsilon = 1e-9);
        assert_relative_eq!(s.model().points[2].y, 220.0, epsilon = 1e-9);
        assert!(!s.is_solve_pending());
    }

    #[test]
    fn test_repair_hint_kept() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        s.request_solve(true).unwrap();
        let outcome = s.receive_solve_response("*del;X;1;-1;L;1;-1;").unwrap();
        assert!(matches!(outcome, Outcome::RepairSuggested(_)));
        assert_eq!(s.repair_hint().unwrap().items.len(), 2);
        assert_eq!(s.mode(), Mode::Constraining);
    }

    #[test]
    fn test_solver_error_frees_slot() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        s.request_solve(true).unwrap();
        assert_eq!(
            s.receive_solve_response("Error: singular"),
            Err(EditorError::SolverReported("Error: singular".to_string()))
        );
        assert!(!s.is_solve_pending());
        assert_eq!(s.receive_solve_response("1;2;3;"), Err(EditorError::NoPendingSolve));
    }

    #[test]
    fn test_fail_pending_solve() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        s.request_solve(true).unwrap();
        s.fail_pending_solve("connection refused").unwrap();
        assert!(!s.is_solve_pending());
        assert_eq!(s.fail_pending_solve("again"), Err(EditorError::NoPendingSolve));
    }

    #[test]
    fn test_save_rules() {
        let mut s = calibrated_triangle();
        assert_eq!(s.save(false), Err(EditorError::UnsolvedSave));
        let chunks = s.save(true).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("saveSketch|1|1||"));
        assert!(s.is_closed());
    }

    #[test]
    fn test_save_needs_calibration() {
        let mut s = SketchSession::default();
        s.begin(None).unwrap();
        assert!(matches!(
            s.save(true),
            Err(EditorError::CalibrationIncomplete { .. })
        ));
        assert!(!s.is_closed());
    }

    // --- Save mid sub-mode ---

    #[test]
    fn test_save_drops_pending_width() {
        let mut s = calibrated_triangle();
        s.settings.solve_policy = SolvePolicy::AllowOverride;
        s.request_solve(true).unwrap();
        s.receive_solve_response("0;0;0;5;0;0;5;-5;0;").unwrap();
        let depth = s.undo_depth();

        s.set_constraint(ConstraintKind::Width, Point::new(100.0, 100.0), Some("5".into()))
            .unwrap();
        assert_eq!(s.mode(), Mode::SettingWidth);

        // back in Solved once the half-built W is gone: no confirmation needed
        let chunks = s.save(false).unwrap();
        let payload = crate::protocol::reassemble_save_chunks(&chunks).unwrap();
        let constraints = payload.split('|').nth(2).unwrap();
        assert_eq!(constraints, "X;1;-1;0.000000;Y;1;-1;0.000000;L;1;-1;5.000000;");
        assert_eq!(s.mode(), Mode::Solved);
        assert!(s.pending_offset().is_none());
        assert_eq!(s.undo_depth(), depth);
        assert!(s.is_closed());
    }

    #[test]
    fn test_rejected_save_keeps_pending_width() {
        let mut s = calibrated_triangle();
        s.set_constraint(ConstraintKind::Depth, Point::new(100.0, 100.0), Some("2".into()))
            .unwrap();
        assert_eq!(s.save(false), Err(EditorError::UnsolvedSave));
        assert_eq!(s.mode(), Mode::SettingDepth);
        assert!(s.pending_offset().is_some());
        assert!(!s.is_closed());
    }

    #[test]
    fn test_save_mid_curvature_keeps_preview() {
        let mut s = SketchSession::default();
        s.begin(Some(Point::new(100.0, 100.0))).unwrap();
        s.append(SegmentKind::Line, Point::new(200.0, 100.0)).unwrap();
        s.model.calibration = Calibration {
            scale: Some(0.05),
            xorig: Some(100.0),
            yorig: Some(100.0),
        };
        s.append(SegmentKind::CircularArc, Point::new(200.0, 200.0))
            .unwrap();
        s.preview_curvature(Point::new(230.0, 150.0));

        s.save(true).unwrap();
        assert_eq!(s.mode(), Mode::Drawing);
        assert_relative_eq!(s.model().segments[1].dip, 30.0, epsilon = 1e-9);
        assert!(s.is_closed());
    }
}
