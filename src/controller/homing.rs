//! Tick-driven homing procedure.
//!
//! 1. Seek the min endstop at the homing speed, for at most
//!    `travel + margin`.
//! 2. Back off a fixed distance.
//! 3. Approach again slowly, for at most `approach_travel`.
//!
//! Exceeding either bound is a [`FaultReason::HomingTimeout`].

use libm::floorf;

use crate::config::{HomingConfig, MechanicalConstraints};
use crate::error::FaultReason;
use crate::hal::{Direction, Endstop, Hal, Limit, StepperDriver};

use super::position::Position;

/// Homing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    /// Fast move toward the min endstop.
    Seek,
    /// Move away from the endstop to release it.
    BackOff,
    /// Slow re-approach for a repeatable trigger point.
    Approach,
}

impl HomingPhase {
    fn direction(self) -> Direction {
        match self {
            HomingPhase::BackOff => Direction::Forward,
            HomingPhase::Seek | HomingPhase::Approach => Direction::Reverse,
        }
    }
}

/// Result of advancing the procedure by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingProgress {
    /// Still moving.
    Running,
    /// Min endstop found on the slow approach; the carriage is at zero.
    Homed,
}

/// Homing procedure state.
#[derive(Debug, Clone)]
pub struct Homing {
    phase: HomingPhase,
    /// Steps issued in the current phase.
    travelled: i64,
    /// Fractional steps carried between ticks.
    carry: f32,
    seek_rate: f32,
    approach_rate: f32,
    seek_limit: i64,
    backoff_steps: i64,
    approach_limit: i64,
}

impl Homing {
    /// Plan homing for the given mechanics.
    pub fn new(config: &HomingConfig, mechanics: &MechanicalConstraints) -> Self {
        let seek_travel = mechanics.travel_mm() + config.margin.0;
        Self {
            phase: HomingPhase::Seek,
            travelled: 0,
            carry: 0.0,
            seek_rate: mechanics.speed_to_steps(config.speed.0),
            approach_rate: mechanics.speed_to_steps(config.approach_speed.0),
            seek_limit: mechanics.mm_to_steps(seek_travel),
            backoff_steps: mechanics.mm_to_steps(config.backoff.0),
            approach_limit: mechanics.mm_to_steps(config.approach_travel.0),
        }
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    fn enter<D: StepperDriver, E: Endstop>(
        &mut self,
        phase: HomingPhase,
        hal: &mut Hal<D, E>,
    ) -> Result<(), FaultReason> {
        log::debug!("homing: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.travelled = 0;
        hal.driver.set_direction(phase.direction())?;
        Ok(())
    }

    /// Issue this tick's steps, integrating each one into `position`.
    ///
    /// # Errors
    ///
    /// `HomingTimeout` when a phase exceeds its travel bound,
    /// `HardwareFault` when the driver or endstop fails.
    pub fn advance<D: StepperDriver, E: Endstop>(
        &mut self,
        hal: &mut Hal<D, E>,
        position: &mut Position,
        dt: f32,
    ) -> Result<HomingProgress, FaultReason> {
        let rate = match self.phase {
            HomingPhase::Seek | HomingPhase::BackOff => self.seek_rate,
            HomingPhase::Approach => self.approach_rate,
        };

        self.carry += rate * dt;
        let mut budget = floorf(self.carry);
        self.carry -= budget;

        hal.driver.set_direction(self.phase.direction())?;
        hal.driver.set_step_rate(rate);

        while budget >= 1.0 {
            match self.phase {
                HomingPhase::Seek => {
                    if hal.triggered(Limit::Min)? {
                        log::info!("homing: min endstop found, backing off");
                        self.enter(HomingPhase::BackOff, hal)?;
                        continue;
                    }
                    if self.travelled >= self.seek_limit {
                        log::error!("homing: no endstop within {} steps", self.seek_limit);
                        return Err(FaultReason::HomingTimeout);
                    }
                }
                HomingPhase::BackOff => {
                    if self.travelled >= self.backoff_steps {
                        self.enter(HomingPhase::Approach, hal)?;
                        hal.driver.set_step_rate(self.approach_rate);
                        continue;
                    }
                }
                HomingPhase::Approach => {
                    if hal.triggered(Limit::Min)? {
                        return Ok(HomingProgress::Homed);
                    }
                    if self.travelled >= self.approach_limit {
                        log::error!("homing: endstop lost on approach");
                        return Err(FaultReason::HomingTimeout);
                    }
                }
            }

            hal.driver.step()?;
            position.move_steps(self.phase.direction().sign());
            self.travelled += 1;
            budget -= 1.0;
        }

        Ok(HomingProgress::Running)
    }
}
