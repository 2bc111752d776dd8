//! Editor modes and pending sub-mode data

use serde::{Deserialize, Serialize};
use shared::ConstraintKind;

/// Interaction mode. The numeric codes are what the host displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No sketch yet
    #[default]
    Initializing,
    /// Open chain accepting segments
    Drawing,
    /// Bulge of the last arc is being chosen
    SettingCurvature,
    /// Closed sketch accepting constraints
    Constraining,
    /// Waiting for the target point of a W constraint
    SettingWidth,
    /// Waiting for the target point of a D constraint
    SettingDepth,
    /// Display state after a successful solve
    Solved,
}

impl Mode {
    pub fn code(&self) -> u8 {
        match self {
            Mode::Initializing => 0,
            Mode::Drawing => 1,
            Mode::SettingCurvature => 2,
            Mode::Constraining => 3,
            Mode::SettingWidth => 4,
            Mode::SettingDepth => 5,
            Mode::Solved => 6,
        }
    }

    /// Constraint commands are accepted
    pub fn accepts_constraints(&self) -> bool {
        matches!(self, Mode::Constraining | Mode::Solved)
    }

    /// Waiting for the second point of an offset constraint
    pub fn is_offset_pending(&self) -> bool {
        matches!(self, Mode::SettingWidth | Mode::SettingDepth)
    }

    /// Pan / zoom / save operate on a stable sketch
    pub fn has_sketch(&self) -> bool {
        matches!(self, Mode::Drawing | Mode::Constraining | Mode::Solved)
    }

    /// i18n key for the mode name
    pub fn label_key(&self) -> &'static str {
        match self {
            Mode::Initializing => "mode.initializing",
            Mode::Drawing => "mode.drawing",
            Mode::SettingCurvature => "mode.curvature",
            Mode::Constraining => "mode.constraining",
            Mode::SettingWidth => "mode.width",
            Mode::SettingDepth => "mode.depth",
            Mode::Solved => "mode.solved",
        }
    }

    pub fn for_offset(kind: ConstraintKind) -> Mode {
        if kind == ConstraintKind::Depth {
            Mode::SettingDepth
        } else {
            Mode::SettingWidth
        }
    }
}

/// First half of a W/D constraint: the base point and the value entered with it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOffset {
    pub kind: ConstraintKind,
    pub base: usize,
    pub value: String,
    /// Mode to go back to if the constraint is abandoned
    pub resume: Mode,
}
