//! Commands accepted by the controller.

use crate::motion::MotionProfile;

/// Operator command.
///
/// Motion commands preempt whatever motion is active; `Stop` is accepted
/// from every state.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Command {
    /// Establish the zero position at the min endstop.
    Home,
    /// Relative move, clamped to the rail.
    Jog {
        /// Signed distance in mm.
        distance_mm: f32,
        /// Requested speed in mm/s.
        speed_mm_s: f32,
    },
    /// Move to the profile's first keyframe, homing first if needed.
    Prime(MotionProfile),
    /// Execute the profile. Requires a homed slider.
    Run(MotionProfile),
    /// Halt all motion.
    Stop,
}

impl Command {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Home => "home",
            Command::Jog { .. } => "jog",
            Command::Prime(_) => "prime",
            Command::Run(_) => "run",
            Command::Stop => "stop",
        }
    }
}
