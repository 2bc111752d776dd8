// Library crate: the whole editor, headless. The binary is a thin JSON-lines driver.

pub mod command;
pub mod display;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod i18n;
pub mod protocol;
pub mod sketch;
pub mod solver;
pub mod state;
