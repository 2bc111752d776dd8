//! Interface strings in Russian and English, plus the one-line status.
//!
//! The language is process-wide, like the host's locale.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::state::SketchSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    Ru,
    En,
}

static CURRENT_LANG: AtomicU8 = AtomicU8::new(1); // 1=En (default)

pub fn lang() -> Lang {
    match CURRENT_LANG.load(Ordering::Relaxed) {
        0 => Lang::Ru,
        _ => Lang::En,
    }
}

pub fn set_lang(l: Lang) {
    CURRENT_LANG.store(
        match l {
            Lang::Ru => 0,
            Lang::En => 1,
        },
        Ordering::Relaxed,
    );
}

/// Translate a key to the current language.
pub fn t(key: &str) -> &'static str {
    let ru = lang() == Lang::Ru;
    match key {
        // ── Modes ───────────────────────────────────────────
        "mode.initializing" => if ru { "Инициализация" } else { "Initializing" },
        "mode.drawing" => if ru { "Рисование" } else { "Drawing" },
        "mode.curvature" => if ru { "Кривизна дуги" } else { "Arc curvature" },
        "mode.constraining" => if ru { "Ограничения" } else { "Constraining" },
        "mode.width" => if ru { "Ширина: выберите вторую точку" } else { "Width: pick second point" },
        "mode.depth" => if ru { "Глубина: выберите вторую точку" } else { "Depth: pick second point" },
        "mode.solved" => if ru { "Решено" } else { "Solved" },

        // ── Solve affordance ────────────────────────────────
        "solve.ready" => if ru { "Решить" } else { "Solve" },
        "solve.constraining" => if ru { "Наложение ограничений..." } else { "Constraining..." },
        "solve.pending" => if ru { "Ожидание решателя..." } else { "Waiting for solver..." },

        // ── Status line ─────────────────────────────────────
        "status.variables" => if ru { "переменных" } else { "variables" },
        "status.constraints" => if ru { "ограничений" } else { "constraints" },
        "status.remaining" => if ru { "осталось" } else { "remaining" },
        "status.repair_delete" => if ru { "Удалите одно из отмеченных ограничений" } else { "Delete one of the highlighted constraints" },
        "status.repair_add" => if ru { "Можно добавить отмеченные ограничения" } else { "Highlighted constraints may be added" },

        // ── Fallback ────────────────────────────────────────
        _ => "???",
    }
}

/// Label of the solve button: enabled only for a fully constrained sketch.
pub fn solve_label(session: &SketchSession) -> &'static str {
    if session.is_solve_pending() {
        t("solve.pending")
    } else if session.model().is_fully_constrained() {
        t("solve.ready")
    } else {
        t("solve.constraining")
    }
}

/// One-line status: mode, variables/constraints, remaining dof, solve state.
pub fn status_line(session: &SketchSession) -> String {
    let model = session.model();
    let mut line = format!(
        "{} | {}: {}, {}: {}, {}: {} | {}",
        t(session.mode().label_key()),
        t("status.variables"),
        model.degrees_of_freedom(),
        t("status.constraints"),
        model.constraint_count(),
        t("status.remaining"),
        model.remaining_dof(),
        solve_label(session),
    );
    if let Some(hint) = session.repair_hint() {
        let key = match hint.action {
            crate::protocol::RepairAction::Delete => "status.repair_delete",
            crate::protocol::RepairAction::Add => "status.repair_add",
        };
        line.push_str(" | ");
        line.push_str(t(key));
    }
    line
}
