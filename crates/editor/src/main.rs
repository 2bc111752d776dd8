use std::io::{BufRead, Write};

use sketch_editor_lib::command::{respond, CommandResponse, EditorCommand};
use sketch_editor_lib::i18n;
use sketch_editor_lib::solver::{deliver_reply, HttpSolveTransport, SolveTransport};
use sketch_editor_lib::state::{EditorSettings, Outcome, SketchSession};

#[derive(Debug, Default)]
struct CliArgs {
    /// JSON array of commands
    script: Option<String>,
    /// File holding a `loadSketch` message
    load: Option<String>,
    solver: Option<String>,
    /// Persist the effective settings (after overrides)
    save_settings: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketch_editor=info".into()),
        )
        .init();

    let args = parse_args();
    let mut settings = EditorSettings::load();
    if let Some(url) = args.solver.clone() {
        settings.solver_url = url;
    }
    i18n::set_lang(settings.language);
    if args.save_settings {
        settings.save();
    }

    let transport = match HttpSolveTransport::new(settings.solver_url.clone()) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to start solver transport: {e}");
            return;
        }
    };
    tracing::info!("Solver endpoint: {}", transport.url());

    let mut driver = Driver {
        session: SketchSession::new(settings),
        transport,
    };

    if let Some(path) = &args.load {
        match std::fs::read_to_string(path) {
            Ok(message) => driver.run(EditorCommand::Load {
                message: message.trim().to_string(),
            }),
            Err(e) => tracing::error!("Failed to read sketch file {path}: {e}"),
        }
    }

    match &args.script {
        Some(path) => driver.run_script(path),
        None => driver.run_stdin(),
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--save-settings" {
            cli.save_settings = true;
            i += 1;
            continue;
        }
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--script" => cli.script = value,
            "--load" => cli.load = value,
            "--solver" => cli.solver = value,
            other => {
                tracing::warn!("Ignoring unknown argument {other}");
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    cli
}

struct Driver {
    session: SketchSession,
    transport: HttpSolveTransport,
}

impl Driver {
    fn emit(&self, response: &CommandResponse) {
        let line = serde_json::to_string(response)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"{e}"}}"#));
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    /// Apply one command; a solve request waits for the solver's answer.
    fn run(&mut self, command: EditorCommand) {
        let result = self.session.apply(command);
        let ticket = match &result {
            Ok(Outcome::SolveRequested(ticket)) => Some(ticket.clone()),
            _ => None,
        };
        self.emit(&respond(result));

        if let Some(ticket) = ticket {
            self.transport.send(&ticket);
            while self.session.is_solve_pending() {
                let Some(reply) = self.transport.recv_blocking() else {
                    tracing::error!("Solver channel closed");
                    break;
                };
                if let Some(result) = deliver_reply(&mut self.session, reply) {
                    self.emit(&respond(result));
                }
            }
        }
    }

    fn run_script(&mut self, path: &str) {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to read script {path}: {e}");
                return;
            }
        };
        match serde_json::from_str::<Vec<EditorCommand>>(&json) {
            Ok(commands) => {
                tracing::info!("Running {} command(s) from {path}", commands.len());
                for command in commands {
                    self.run(command);
                    if self.session.is_closed() {
                        break;
                    }
                }
            }
            Err(e) => self.emit(&CommandResponse::err(format!("Invalid commands JSON: {e}"))),
        }
    }

    fn run_stdin(&mut self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EditorCommand>(&line) {
                Ok(command) => self.run(command),
                Err(e) => self.emit(&CommandResponse::err(format!("Invalid command JSON: {e}"))),
            }
            if self.session.is_closed() {
                break;
            }
        }
    }
}
