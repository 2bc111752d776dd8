//! Transport between the editor and the remote constraint solver.
//!
//! The session only builds the request and interprets the answer; this
//! module moves the text. [`pump_solver`] hands replies back to the
//! session, discarding anything that does not match the pending request.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::command::EditorCommand;
use crate::error::{EditorError, EditorResult};
use crate::state::{Outcome, SketchSession, SolveTicket};

/// Answer (or transport failure) for one solve request.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReply {
    pub request_id: Uuid,
    pub body: Result<String, String>,
}

/// JSON body posted to the solver endpoint
#[derive(Debug, Serialize, Deserialize)]
struct SolveEnvelope {
    request_id: Uuid,
    message: String,
}

pub trait SolveTransport {
    /// Hand a request to the solver. Failures come back through [`SolveTransport::poll`].
    fn send(&mut self, ticket: &SolveTicket);

    /// Next reply, without blocking.
    fn poll(&mut self) -> Option<SolveReply>;
}

// ============================================================================
// HTTP transport
// ============================================================================

pub struct HttpSolveTransport {
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
    url: String,
    tx: mpsc::UnboundedSender<SolveReply>,
    rx: mpsc::UnboundedReceiver<SolveReply>,
}

impl HttpSolveTransport {
    pub fn new(url: impl Into<String>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            client: reqwest::Client::new(),
            url: url.into(),
            tx,
            rx,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next reply. Must not be called from inside the runtime.
    pub fn recv_blocking(&mut self) -> Option<SolveReply> {
        self.rx.blocking_recv()
    }
}

async fn post_solve(
    client: &reqwest::Client,
    url: &str,
    envelope: &SolveEnvelope,
) -> Result<String, reqwest::Error> {
    let reply: SolveEnvelope = client
        .post(url)
        .json(envelope)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    if reply.request_id != envelope.request_id {
        tracing::warn!(
            "Solver answered {} to request {}",
            reply.request_id,
            envelope.request_id
        );
    }
    Ok(reply.message)
}

impl SolveTransport for HttpSolveTransport {
    fn send(&mut self, ticket: &SolveTicket) {
        let client = self.client.clone();
        let url = self.url.clone();
        let tx = self.tx.clone();
        let envelope = SolveEnvelope {
            request_id: ticket.request_id,
            message: ticket.message.clone(),
        };
        self.runtime.spawn(async move {
            let body = post_solve(&client, &url, &envelope).await.map_err(|e| {
                tracing::error!("Solve request {} to {url} failed: {e}", envelope.request_id);
                e.to_string()
            });
            let _ = tx.send(SolveReply {
                request_id: envelope.request_id,
                body,
            });
        });
    }

    fn poll(&mut self) -> Option<SolveReply> {
        self.rx.try_recv().ok()
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Forward one reply to the session. `None` when the reply is stale.
pub fn deliver_reply(session: &mut SketchSession, reply: SolveReply) -> Option<EditorResult<Outcome>> {
    if session.pending_request_id() != Some(reply.request_id) {
        tracing::warn!("Dropping stale solver reply {}", reply.request_id);
        return None;
    }
    Some(match reply.body {
        Ok(message) => session.apply(EditorCommand::SolveResponse { message }),
        Err(reason) => session
            .fail_pending_solve(&reason)
            .and(Err(EditorError::SolverUnreachable(reason))),
    })
}

/// Drain the transport into the session.
pub fn pump_solver(
    session: &mut SketchSession,
    transport: &mut impl SolveTransport,
) -> Vec<EditorResult<Outcome>> {
    let mut results = Vec::new();
    while let Some(reply) = transport.poll() {
        if let Some(result) = deliver_reply(session, reply) {
            results.push(result);
        }
    }
    results
}
