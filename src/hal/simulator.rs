//! Simulator variant: a virtual carriage on a virtual rail.
//!
//! Steps move a shared atomic position with no timing constraint, and the
//! endstops are synthesised from that position, so homing, jogging and
//! endstop faults behave exactly as on hardware. The [`Simulator`] handle
//! stays with the caller after the driver and endstops are handed to a
//! controller, and exposes hooks for tests and demos.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{Millimeters, SliderConfig, StepLimits, Steps};
use crate::error::HalError;

use super::{Direction, Endstop, Hal, Limit, StepperDriver};

#[derive(Debug)]
struct SimState {
    position: AtomicI64,
    travel_steps: i64,
    steps_per_mm: f32,
    forward: AtomicBool,
    enabled: AtomicBool,
    steps_issued: AtomicU64,
    step_rate_bits: AtomicU32,
    driver_fault: AtomicBool,
    forced: [AtomicBool; 2],
    disconnected: [AtomicBool; 2],
}

fn slot(limit: Limit) -> usize {
    match limit {
        Limit::Min => 0,
        Limit::Max => 1,
    }
}

/// Handle to a simulated slider.
#[derive(Debug, Clone)]
pub struct Simulator {
    state: Arc<SimState>,
}

impl Simulator {
    /// Virtual rail matching the configured mechanics, carriage at 0.
    pub fn new(config: &SliderConfig) -> Self {
        let steps_per_mm = config.steps_per_mm();
        let travel_steps = StepLimits::from_travel(&config.travel(), steps_per_mm).max_steps;

        Self {
            state: Arc::new(SimState {
                position: AtomicI64::new(0),
                travel_steps,
                steps_per_mm,
                forward: AtomicBool::new(true),
                enabled: AtomicBool::new(false),
                steps_issued: AtomicU64::new(0),
                step_rate_bits: AtomicU32::new(0),
                driver_fault: AtomicBool::new(false),
                forced: [AtomicBool::new(false), AtomicBool::new(false)],
                disconnected: [AtomicBool::new(false), AtomicBool::new(false)],
            }),
        }
    }

    /// Start the carriage somewhere other than the home end.
    pub fn with_start_mm(self, mm: f32) -> Self {
        self.set_position_mm(mm);
        self
    }

    /// Simulated driver sharing this rail.
    pub fn driver(&self) -> SimDriver {
        SimDriver {
            state: Arc::clone(&self.state),
        }
    }

    /// Simulated endstop at one end of this rail.
    pub fn endstop(&self, limit: Limit) -> SimEndstop {
        SimEndstop {
            state: Arc::clone(&self.state),
            limit,
        }
    }

    /// Driver plus both endstops.
    pub fn hal(&self) -> Hal<SimDriver, SimEndstop> {
        Hal::new(self.driver(), self.endstop(Limit::Min), self.endstop(Limit::Max))
    }

    /// Physical carriage position in steps.
    pub fn position_steps(&self) -> i64 {
        self.state.position.load(Ordering::SeqCst)
    }

    /// Physical carriage position in mm.
    pub fn position_mm(&self) -> f32 {
        Steps(self.position_steps()).to_mm(self.state.steps_per_mm).0
    }

    /// Teleport the carriage.
    pub fn set_position_mm(&self, mm: f32) {
        let steps = Steps::from_mm(Millimeters(mm), self.state.steps_per_mm).0;
        self.state.position.store(steps, Ordering::SeqCst);
    }

    /// Total steps issued since creation.
    pub fn steps_issued(&self) -> u64 {
        self.state.steps_issued.load(Ordering::SeqCst)
    }

    /// Whether the driver is currently energized.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    /// Last step rate hint in steps/s.
    pub fn step_rate(&self) -> f32 {
        f32::from_bits(self.state.step_rate_bits.load(Ordering::SeqCst))
    }

    /// Hold an endstop triggered regardless of position.
    pub fn force_endstop(&self, limit: Limit, forced: bool) {
        self.state.forced[slot(limit)].store(forced, Ordering::SeqCst);
    }

    /// Make an endstop read as never triggered (broken wire).
    pub fn disconnect_endstop(&self, limit: Limit, disconnected: bool) {
        self.state.disconnected[slot(limit)].store(disconnected, Ordering::SeqCst);
    }

    /// Make every subsequent `step()` fail.
    pub fn inject_fault(&self, fault: bool) {
        self.state.driver_fault.store(fault, Ordering::SeqCst);
    }
}

/// Driver half of the simulator.
#[derive(Debug)]
pub struct SimDriver {
    state: Arc<SimState>,
}

impl StepperDriver for SimDriver {
    fn step(&mut self) -> Result<(), HalError> {
        if self.state.driver_fault.load(Ordering::SeqCst) {
            return Err(HalError::Pin);
        }
        let delta = if self.state.forward.load(Ordering::SeqCst) {
            1
        } else {
            -1
        };
        self.state.position.fetch_add(delta, Ordering::SeqCst);
        self.state.steps_issued.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HalError> {
        self.state
            .forward
            .store(direction == Direction::Forward, Ordering::SeqCst);
        Ok(())
    }

    fn enable(&mut self, enabled: bool) -> Result<(), HalError> {
        self.state.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn set_step_rate(&mut self, steps_per_sec: f32) {
        self.state
            .step_rate_bits
            .store(steps_per_sec.to_bits(), Ordering::SeqCst);
    }
}

/// Endstop half of the simulator.
#[derive(Debug)]
pub struct SimEndstop {
    state: Arc<SimState>,
    limit: Limit,
}

impl Endstop for SimEndstop {
    fn triggered(&mut self) -> Result<bool, HalError> {
        let i = slot(self.limit);
        if self.state.disconnected[i].load(Ordering::SeqCst) {
            return Ok(false);
        }
        if self.state.forced[i].load(Ordering::SeqCst) {
            return Ok(true);
        }

        let position = self.state.position.load(Ordering::SeqCst);
        Ok(match self.limit {
            Limit::Min => position <= 0,
            Limit::Max => position >= self.state.travel_steps,
        })
    }
}
