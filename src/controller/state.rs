//! Controller state and the published status snapshot.

use serde::Serialize;

use crate::error::FaultReason;

/// What the controller is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// No motion; driver released.
    #[default]
    Idle,
    /// Establishing the zero position against the min endstop.
    Homing,
    /// Moving to the first keyframe of a profile (homing first if needed).
    Priming,
    /// Following a planned trajectory.
    Running,
    /// Relative manual move.
    Jogging,
    /// Motion halted; becomes `Idle` on the next tick.
    Stopping,
    /// Faulted; only Home or Stop are accepted.
    Error(FaultReason),
}

impl ControllerState {
    /// True while a motion command is executing.
    #[inline]
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            ControllerState::Homing
                | ControllerState::Priming
                | ControllerState::Running
                | ControllerState::Jogging
        )
    }

    /// Fault reason, if in `Error`.
    #[inline]
    pub fn fault(&self) -> Option<FaultReason> {
        match self {
            ControllerState::Error(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Consistent read-only view of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SliderStatus {
    /// Current state.
    pub state: ControllerState,
    /// Position estimate in mm, always within `[0, travel]`.
    pub pos_mm: f32,
    /// Whether the zero position is trusted.
    pub homed: bool,
    /// Fraction complete; meaningful while Running or Priming.
    pub progress: f32,
}
