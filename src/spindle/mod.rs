pub mod controller;
pub mod instruction;
pub mod spindle_controller_interface;
pub mod spindle_feedback;
pub mod state_machine;

use crate::output::OutputError;
use crate::settings::SettingsError;
use thiserror::Error;

pub use controller::{LifecycleEvent, SpindleController};
pub use instruction::Instruction;
pub use spindle_controller_interface::{SpindleControllerInterface, FEEDBACK_CAPACITY};
pub use spindle_feedback::SpindleFeedback;
pub use state_machine::{SpindleState, SpindleStateMachine};

#[derive(Debug, Error)]
pub enum SpindleError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("spindle output failed: {0}")]
    Output(#[from] OutputError),
}

/// Snapshot of the spindle published after every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpindleStatus {
    pub connected: bool,
    pub stopped: bool,
    pub target_value: f64,
    pub applied_value: Option<f64>,
}
