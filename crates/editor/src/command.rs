//! JSON command protocol for the host.
//!
//! One command per JSON object, tagged by `"command"`. Positions are screen pixels.

use serde::{Deserialize, Serialize};
use shared::ConstraintKind;

use crate::error::EditorResult;
use crate::state::{Outcome, PanDirection, SketchSession, ZoomDirection};

/// A command the host can send to the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    /// Start a new sketch with its anchor at `at` (canvas center by default)
    Begin {
        #[serde(default)]
        at: Option<[f64; 2]>,
    },
    /// Load a sketch from a `loadSketch|...` message
    Load { message: String },
    /// Pointer moved
    Hover { at: [f64; 2] },
    /// Plain canvas click: fixes a pending arc bulge or picks the W/D target
    Click { at: [f64; 2] },
    AppendLine { at: [f64; 2] },
    AppendArc { at: [f64; 2] },
    AppendSplinePoint { at: [f64; 2] },
    AppendBezierPoint { at: [f64; 2] },
    /// Split the current spline/Bezier run
    AppendZeroLength,
    CloseSketch,
    SetConstraint {
        kind: ConstraintKind,
        at: [f64; 2],
        #[serde(default)]
        value: Option<String>,
    },
    DeleteConstraint {
        at: [f64; 2],
        #[serde(default)]
        kind: Option<ConstraintKind>,
    },
    QueryNearest { at: [f64; 2] },
    DumpModel,
    Pan { direction: PanDirection },
    Zoom { direction: ZoomDirection },
    RescaleToFit,
    Undo,
    Solve {
        #[serde(default)]
        force: bool,
    },
    /// Solver answer to the pending request
    SolveResponse { message: String },
    Save {
        #[serde(default)]
        confirm_unsolved: bool,
    },
    Cancel,
    Status,
}

impl EditorCommand {
    /// Cursor position carried by the command, if any
    pub fn cursor(&self) -> Option<kurbo::Point> {
        match self {
            EditorCommand::Begin { at: Some(at) }
            | EditorCommand::Hover { at }
            | EditorCommand::Click { at }
            | EditorCommand::AppendLine { at }
            | EditorCommand::AppendArc { at }
            | EditorCommand::AppendSplinePoint { at }
            | EditorCommand::AppendBezierPoint { at }
            | EditorCommand::SetConstraint { at, .. }
            | EditorCommand::DeleteConstraint { at, .. }
            | EditorCommand::QueryNearest { at } => Some(crate::sketch::to_point(*at)),
            _ => None,
        }
    }

    /// Commands that never complete a pending sub-mode
    pub fn is_passive(&self) -> bool {
        matches!(
            self,
            EditorCommand::Hover { .. }
                | EditorCommand::Undo
                | EditorCommand::Status
                | EditorCommand::QueryNearest { .. }
                | EditorCommand::DumpModel
                | EditorCommand::SolveResponse { .. }
        )
    }

    /// Commands that close the editor. A pending sub-mode is wound up, not completed.
    pub fn ends_session(&self) -> bool {
        matches!(self, EditorCommand::Save { .. } | EditorCommand::Cancel)
    }
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

/// Turn a session result into the host response.
pub fn respond(result: EditorResult<Outcome>) -> CommandResponse {
    match result {
        Ok(Outcome::Updated) => CommandResponse::ok(),
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(data) => CommandResponse::ok_with_data(data),
            Err(e) => CommandResponse::err(format!("Cannot encode outcome: {e}")),
        },
        Err(e) => CommandResponse::err(e.to_string()),
    }
}

/// Execute a single command on the session.
pub fn execute_command(session: &mut SketchSession, cmd: EditorCommand) -> CommandResponse {
    respond(session.apply(cmd))
}

/// Parse and execute a single JSON command string.
pub fn execute_json(session: &mut SketchSession, json: &str) -> Result<CommandResponse, String> {
    let cmd: EditorCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(session, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    session: &mut SketchSession,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<EditorCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(session, cmd))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serde_undo() {
        let cmd: EditorCommand = serde_json::from_str(r#"{"command": "undo"}"#).unwrap();
        assert_eq!(cmd, EditorCommand::Undo);
    }

    #[test]
    fn test_command_serde_set_constraint() {
        let json = r#"{"command": "set_constraint", "kind": "L", "at": [10, 20], "value": "5"}"#;
        let cmd: EditorCommand = serde_json::from_str(json).unwrap();
        match cmd {
            EditorCommand::SetConstraint { kind, at, value } => {
                assert_eq!(kind, ConstraintKind::Length);
                assert_eq!(at, [10.0, 20.0]);
                assert_eq!(value.as_deref(), Some("5"));
            }
            _ => panic!("Expected SetConstraint"),
        }
    }

    #[test]
    fn test_command_serde_defaults() {
        let cmd: EditorCommand = serde_json::from_str(r#"{"command": "solve"}"#).unwrap();
        assert_eq!(cmd, EditorCommand::Solve { force: false });
        let cmd: EditorCommand = serde_json::from_str(r#"{"command": "begin"}"#).unwrap();
        assert_eq!(cmd, EditorCommand::Begin { at: None });
        let cmd: EditorCommand =
            serde_json::from_str(r#"{"command": "pan", "direction": "left"}"#).unwrap();
        assert_eq!(
            cmd,
            EditorCommand::Pan {
                direction: PanDirection::Left
            }
        );
    }

    #[test]
    fn test_cursor_and_passive() {
        let append = EditorCommand::AppendArc { at: [1.0, 2.0] };
        assert_eq!(append.cursor(), Some(kurbo::Point::new(1.0, 2.0)));
        assert!(!append.is_passive());
        assert_eq!(EditorCommand::CloseSketch.cursor(), None);
        assert!(EditorCommand::Hover { at: [0.0, 0.0] }.is_passive());

        let click = EditorCommand::Click { at: [3.0, 4.0] };
        assert_eq!(click.cursor(), Some(kurbo::Point::new(3.0, 4.0)));
        assert!(!click.is_passive());
        assert!(EditorCommand::Save { confirm_unsolved: true }.ends_session());
        assert!(EditorCommand::Cancel.ends_session());
        assert!(!EditorCommand::Cancel.is_passive());
    }

    #[test]
    fn test_execute_begin_and_status() {
        let mut s = SketchSession::default();
        let resp = execute_json(&mut s, r#"{"command": "begin", "at": [100, 100]}"#).unwrap();
        assert!(resp.success);
        assert!(resp.data.is_none());

        let resp = execute_json(&mut s, r#"{"command": "status"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["outcome"], "status");
        assert_eq!(data["mode_code"], 1);
        assert_eq!(data["variables"], 2);
    }

    #[test]
    fn test_execute_error_carries_message() {
        let mut s = SketchSession::default();
        let resp = execute_json(&mut s, r#"{"command": "undo"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Nothing to undo"));
    }

    #[test]
    fn test_execute_invalid_json() {
        let mut s = SketchSession::default();
        assert!(execute_json(&mut s, "not valid json").is_err());
        assert!(execute_json(&mut s, r#"{"command": "fly"}"#).is_err());
    }
}
