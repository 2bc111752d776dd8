//! Headless test harness for driving a sketch session by pixel coordinates.
//!
//! Wraps a [`SketchSession`] and a [`ScriptedSolver`], so tests read like
//! a user's clicks: begin, line to, set constraint, solve.

use kurbo::Point;
use shared::{ConstraintKind, SegmentKind};

use crate::command::{execute_command, CommandResponse, EditorCommand};
use crate::display::{draw_list, DrawItem};
use crate::error::EditorResult;
use crate::fixtures::ScriptedSolver;
use crate::solver::{pump_solver, SolveTransport};
use crate::state::{EditorSettings, Mode, Outcome, SketchSession, SolvePolicy, StatusReport};

/// Headless test harness: one session and its scripted solver
pub struct TestHarness {
    pub session: SketchSession,
    pub solver: ScriptedSolver,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Create a harness with default settings.
    pub fn new() -> Self {
        Self::with_settings(EditorSettings::default())
    }

    pub fn with_settings(settings: EditorSettings) -> Self {
        Self {
            session: SketchSession::new(settings),
            solver: ScriptedSolver::new(),
        }
    }

    pub fn with_policy(policy: SolvePolicy) -> Self {
        Self::with_settings(EditorSettings {
            solve_policy: policy,
            ..EditorSettings::default()
        })
    }

    /// Harness whose session is loaded from a `loadSketch` message.
    pub fn loaded(message: &str) -> EditorResult<Self> {
        let mut h = Self::new();
        h.session.load(message)?;
        Ok(h)
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn apply(&mut self, command: EditorCommand) -> EditorResult<Outcome> {
        self.session.apply(command)
    }

    /// Run a command the way the host does and return its JSON response.
    pub fn execute(&mut self, command: EditorCommand) -> CommandResponse {
        execute_command(&mut self.session, command)
    }

    // ── Drawing ───────────────────────────────────────────────

    pub fn begin(&mut self, x: f64, y: f64) -> EditorResult<Outcome> {
        self.apply(EditorCommand::Begin { at: Some([x, y]) })
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> EditorResult<Outcome> {
        self.apply(EditorCommand::AppendLine { at: [x, y] })
    }

    /// Append an arc, then fix its bulge by clicking at `bend`.
    pub fn arc_to(&mut self, x: f64, y: f64, bend: [f64; 2]) -> EditorResult<Outcome> {
        self.apply(EditorCommand::AppendArc { at: [x, y] })?;
        self.apply(EditorCommand::Hover { at: bend })?;
        self.click(bend)
    }

    pub fn spline_to(&mut self, x: f64, y: f64) -> EditorResult<Outcome> {
        self.apply(EditorCommand::AppendSplinePoint { at: [x, y] })
    }

    pub fn bezier_to(&mut self, x: f64, y: f64) -> EditorResult<Outcome> {
        self.apply(EditorCommand::AppendBezierPoint { at: [x, y] })
    }

    pub fn split_run(&mut self) -> EditorResult<Outcome> {
        self.apply(EditorCommand::AppendZeroLength)
    }

    pub fn close(&mut self) -> EditorResult<Outcome> {
        self.apply(EditorCommand::CloseSketch)
    }

    /// Begin at the first vertex, draw lines through the rest and close.
    pub fn draw_polygon(&mut self, vertices: &[[f64; 2]]) -> EditorResult<()> {
        let Some((first, rest)) = vertices.split_first() else {
            return Ok(());
        };
        self.begin(first[0], first[1])?;
        for v in rest {
            self.line_to(v[0], v[1])?;
        }
        self.close()?;
        Ok(())
    }

    /// Right triangle (100,100) → (200,100) → (200,200), closed.
    pub fn draw_triangle(&mut self) -> EditorResult<()> {
        self.draw_polygon(&[[100.0, 100.0], [200.0, 100.0], [200.0, 200.0]])
    }

    // ── Constraints ───────────────────────────────────────────

    pub fn set(&mut self, kind: ConstraintKind, at: [f64; 2], value: Option<&str>) -> EditorResult<Outcome> {
        self.apply(EditorCommand::SetConstraint {
            kind,
            at,
            value: value.map(str::to_string),
        })
    }

    /// Plain click: completes a pending arc bulge or width/depth target.
    pub fn click(&mut self, at: [f64; 2]) -> EditorResult<Outcome> {
        self.apply(EditorCommand::Click { at })
    }

    pub fn delete(&mut self, at: [f64; 2], kind: Option<ConstraintKind>) -> EditorResult<Outcome> {
        self.apply(EditorCommand::DeleteConstraint { at, kind })
    }

    pub fn undo(&mut self) -> EditorResult<Outcome> {
        self.apply(EditorCommand::Undo)
    }

    // ── Solve ─────────────────────────────────────────────────

    /// Request a solve, pass it through the scripted solver and apply the reply.
    /// Returns the session's verdict on the reply, or the request error.
    pub fn solve(&mut self, force: bool) -> EditorResult<Option<Outcome>> {
        let ticket = self.session.request_solve(force)?;
        self.solver.send(&ticket);
        pump_solver(&mut self.session, &mut self.solver)
            .pop()
            .transpose()
    }

    /// Script the next solver answer, then solve.
    pub fn solve_with(&mut self, answer: &str, force: bool) -> EditorResult<Option<Outcome>> {
        self.solver.answer_next(answer);
        self.solve(force)
    }

    pub fn save(&mut self, confirm_unsolved: bool) -> EditorResult<Vec<String>> {
        self.session.save(confirm_unsolved)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn point(&self, index: usize) -> Point {
        self.session.model().point_pos(index)
    }

    pub fn point_label(&self, index: usize) -> &str {
        self.session
            .model()
            .points
            .get(index)
            .map_or("", |p| p.label.as_str())
    }

    pub fn segment_kinds(&self) -> Vec<SegmentKind> {
        self.session.model().segments.iter().map(|s| s.kind).collect()
    }

    /// Codes of all constraints, in model order
    pub fn constraint_codes(&self) -> String {
        self.session
            .model()
            .constraints
            .iter()
            .map(|c| c.kind.code())
            .collect()
    }

    pub fn status(&self) -> StatusReport {
        self.session.status_report()
    }

    pub fn draw_list(&self) -> Vec<DrawItem> {
        draw_list(&self.session)
    }
}
