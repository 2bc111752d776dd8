//! Canned sketches and a scripted solver for tests and the command interface.

use std::collections::VecDeque;

use crate::solver::{SolveReply, SolveTransport};
use crate::state::{EditorSettings, SketchSession, SolveTicket};

// ── Load messages ───────────────────────────────────────────────

/// Closed right triangle 5 × 5 with X, Y on the anchor and L=5 on the first side.
pub const TRIANGLE_LOAD: &str = "loadSketch|main|0;0;0;0|\
    x1;0;y1;0;x2;5;y2;0;x3;5;y3;5;|\
    X;1;-1;0;Y;1;-1;0;L;1;-1;5;|\
    L;1;2;L;2;3;L;3;1;|";

/// No geometry yet: the anchor goes to the canvas center.
pub const FRESH_LOAD: &str = "loadSketch|draft|10;20;0;0||||";

/// Half disc: an arc bulging by 5 followed by a closing line.
pub const ARC_LOAD: &str = "loadSketch|arc|0;0;0;0|\
    x1;0;y1;0;x2;10;y2;0;d1;5;|\
    X;1;-1;0;Y;1;-1;0;|\
    C;1;2;L;2;1;|";

// ── Session factories ───────────────────────────────────────────

/// Session with default settings, loaded from `message`.
pub fn loaded_session(message: &str) -> SketchSession {
    let mut session = SketchSession::new(EditorSettings::default());
    if let Err(e) = session.load(message) {
        tracing::error!("Fixture load failed: {e}");
    }
    session
}

pub fn triangle_session() -> SketchSession {
    loaded_session(TRIANGLE_LOAD)
}

pub fn arc_session() -> SketchSession {
    loaded_session(ARC_LOAD)
}

// ── Scripted solver ─────────────────────────────────────────────

/// Transport that answers each request with the next scripted reply.
/// Requests beyond the script stay unanswered.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    script: VecDeque<Result<String, String>>,
    outbox: VecDeque<SolveReply>,
    sent: Vec<SolveTicket>,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests, in order, with these solver messages.
    pub fn answering<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: answers.into_iter().map(|a| Ok(a.into())).collect(),
            ..Self::default()
        }
    }

    /// Fail the next request as if the solver were unreachable.
    pub fn fail_next(&mut self, reason: impl Into<String>) -> &mut Self {
        self.script.push_back(Err(reason.into()));
        self
    }

    pub fn answer_next(&mut self, message: impl Into<String>) -> &mut Self {
        self.script.push_back(Ok(message.into()));
        self
    }

    /// Tickets received so far
    pub fn sent(&self) -> &[SolveTicket] {
        &self.sent
    }
}

impl SolveTransport for ScriptedSolver {
    fn send(&mut self, ticket: &SolveTicket) {
        self.sent.push(ticket.clone());
        if let Some(body) = self.script.pop_front() {
            self.outbox.push_back(SolveReply {
                request_id: ticket.request_id,
                body,
            });
        }
    }

    fn poll(&mut self) -> Option<SolveReply> {
        self.outbox.pop_front()
    }
}
