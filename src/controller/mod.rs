//! Slider controller.
//!
//! - [`Controller`]: deterministic state machine driven by `submit`/`tick`
//! - [`ControllerHandle`] (std): the same machine on a background thread
//! - [`Homing`]: the three-phase homing procedure
//! - [`Position`]: step-integrated carriage position
//! - [`Follower`]: acceleration-limited step generation toward a moving goal

mod command;
mod follower;
#[cfg(feature = "std")]
mod handle;
mod homing;
mod machine;
mod position;
mod state;

pub use command::Command;
pub use follower::{braking_speed, FollowTarget, Follower};
#[cfg(feature = "std")]
pub use handle::ControllerHandle;
pub use homing::{Homing, HomingPhase, HomingProgress};
pub use machine::{
    Controller, ENDSTOP_ZONE_MM, MIN_JOG_SPEED_MM_S, PRIME_SPEED_MM_S, PRIME_TOLERANCE_MM,
};
pub use position::Position;
pub use state::{ControllerState, SliderStatus};
