//! The controller state machine.
//!
//! [`Controller`] owns the carriage state exclusively. Commands are applied
//! with [`Controller::submit`] and motion advances only in
//! [`Controller::tick`], so the machine is deterministic for a given
//! command/tick sequence. [`ControllerHandle`](super::ControllerHandle)
//! runs it on a background thread.

use core::mem;

use libm::fabsf;

use crate::config::{HomingConfig, MechanicalConstraints, SliderConfig};
use crate::error::{FaultReason, MotionError, Result};
use crate::hal::{Direction, Endstop, Hal, Limit, StepperDriver};
use crate::motion::{plan, MotionProfile, Ramp, Trajectory};

use super::command::Command;
use super::follower::{FollowTarget, Follower};
use super::homing::{Homing, HomingProgress};
use super::position::Position;
use super::state::{ControllerState, SliderStatus};

/// Prime never moves faster than this.
pub const PRIME_SPEED_MM_S: f32 = 50.0;

/// Prime skips motion when already this close to the start position.
pub const PRIME_TOLERANCE_MM: f32 = 0.5;

/// Slowest jog speed.
pub const MIN_JOG_SPEED_MM_S: f32 = 1.0;

/// Distance from a rail end within which its endstop may read triggered
/// while running.
pub const ENDSTOP_ZONE_MM: f32 = 1.0;

/// Straight-line move toward a fixed target.
#[derive(Debug, Clone)]
struct Move {
    origin_mm: f32,
    target_steps: i64,
    ramp: Ramp,
    elapsed: f32,
    speed: f32,
    accel: f32,
}

/// Prime move waiting for implicit homing to finish.
#[derive(Debug, Clone, Copy)]
struct PrimePlan {
    target_mm: f32,
    speed: f32,
    accel: f32,
}

#[derive(Debug, Clone)]
struct Run {
    trajectory: Trajectory,
    elapsed: f32,
    limit_mm: f32,
    speed: f32,
    accel: f32,
}

/// Work in progress.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
enum Activity {
    None,
    Homing {
        procedure: Homing,
        then_prime: Option<PrimePlan>,
    },
    Jog(Move),
    Prime(Move),
    Run(Run),
}

/// Outcome of one tick of an activity.
enum Step {
    Continue(Activity),
    Done,
}

/// How endstops are treated while following a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    /// A trip ends the move and re-syncs the position.
    Jog,
    /// A trip in the direction of travel is a fault.
    Prime,
    /// Any trip away from its own end, or in the direction of travel, is a
    /// fault.
    Run,
}

enum Followed {
    Moved,
    Tripped(Limit),
}

/// Deterministic slider controller.
pub struct Controller<D: StepperDriver, E: Endstop> {
    hal: Hal<D, E>,
    mechanics: MechanicalConstraints,
    homing: HomingConfig,
    position: Position,
    state: ControllerState,
    homed: bool,
    progress: f32,
    activity: Activity,
    follower: Follower,
}

impl<D: StepperDriver, E: Endstop> Controller<D, E> {
    /// Create an idle, unhomed controller at position 0.
    ///
    /// The driver is released immediately.
    pub fn new(hal: Hal<D, E>, config: &SliderConfig) -> Self {
        let mechanics = MechanicalConstraints::from_config(config);
        let position = Position::new(mechanics.steps_per_mm, mechanics.limits);

        let mut controller = Self {
            hal,
            mechanics,
            homing: config.homing.clone(),
            position,
            state: ControllerState::Idle,
            homed: false,
            progress: 0.0,
            activity: Activity::None,
            follower: Follower::new(),
        };
        controller.release();
        controller
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether the zero position is trusted.
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.homed
    }

    /// Position estimate in mm.
    #[inline]
    pub fn position_mm(&self) -> f32 {
        self.position.mm()
    }

    /// Mechanical constraints in use.
    #[inline]
    pub fn mechanics(&self) -> &MechanicalConstraints {
        &self.mechanics
    }

    /// Consistent snapshot of state, position, homed flag and progress.
    pub fn status(&self) -> SliderStatus {
        SliderStatus {
            state: self.state,
            pos_mm: self.position.mm(),
            homed: self.homed,
            progress: self.progress,
        }
    }

    /// Apply a command.
    ///
    /// Validation happens before any state change: a rejected command
    /// leaves the controller exactly as it was. An accepted motion command
    /// preempts the active one.
    ///
    /// # Errors
    ///
    /// - `InvalidProfile` for a malformed Prime/Run profile
    /// - `NotHomed` for Run before a successful Home
    /// - `Faulted` for anything but Home/Stop while in `Error`
    /// - `InvalidJog` for a non-finite jog
    /// - `Hardware` if the driver cannot be energized (the controller
    ///   enters `Error(HardwareFault)`)
    pub fn submit(&mut self, command: Command) -> Result<()> {
        log::debug!("command: {}", command.name());

        if let Command::Stop = command {
            self.stop();
            return Ok(());
        }

        if let (Some(reason), false) = (self.state.fault(), matches!(command, Command::Home)) {
            return Err(MotionError::Faulted(reason).into());
        }

        match command {
            Command::Home => self.start_homing(None),
            Command::Jog {
                distance_mm,
                speed_mm_s,
            } => {
                if !distance_mm.is_finite() || !speed_mm_s.is_finite() {
                    return Err(MotionError::InvalidJog.into());
                }
                self.start_jog(distance_mm, speed_mm_s)
            }
            Command::Prime(profile) => {
                let prime = self.prime_plan(profile.validated()?);
                if self.homed {
                    self.start_prime(prime)
                } else {
                    self.start_homing(Some(prime))
                }
            }
            Command::Run(profile) => {
                let trajectory = plan(&profile)?;
                if !self.homed {
                    return Err(MotionError::NotHomed.into());
                }
                self.start_run(trajectory)
            }
            Command::Stop => Ok(()),
        }
    }

    /// Halt immediately. Always succeeds, from every state.
    ///
    /// Active motion passes through `Stopping` until the next tick; from
    /// `Idle` or `Error` the controller goes straight to `Idle`.
    pub fn stop(&mut self) {
        let was_moving = self.state.is_moving();
        self.activity = Activity::None;
        self.follower.reset();
        self.release();

        if was_moving {
            log::info!("stop: halting {:?}", self.state);
            self.set_state(ControllerState::Stopping);
        } else if self.state != ControllerState::Idle && self.state != ControllerState::Stopping {
            log::info!("stop: clearing {:?}", self.state);
            self.set_state(ControllerState::Idle);
        }
    }

    /// Advance motion by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if self.state == ControllerState::Stopping {
            self.set_state(ControllerState::Idle);
            return;
        }
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let outcome = match mem::replace(&mut self.activity, Activity::None) {
            Activity::None => return,
            Activity::Homing {
                procedure,
                then_prime,
            } => self.tick_homing(procedure, then_prime, dt),
            Activity::Jog(mv) => self.tick_jog(mv, dt),
            Activity::Prime(mv) => self.tick_prime(mv, dt),
            Activity::Run(run) => self.tick_run(run, dt),
        };

        match outcome {
            Ok(Step::Continue(activity)) => self.activity = activity,
            Ok(Step::Done) => self.finish(),
            Err(reason) => self.fault(reason),
        }
    }

    // ---------------------------------------------------------------------
    // Command starts
    // ---------------------------------------------------------------------

    /// Abort whatever is moving before a new motion command takes over.
    fn preempt(&mut self) {
        if self.state.is_moving() {
            log::info!("preempting {:?}", self.state);
        }
        self.activity = Activity::None;
        self.follower.reset();
    }

    fn start_homing(&mut self, then_prime: Option<PrimePlan>) -> Result<()> {
        self.preempt();
        self.energize()?;
        // the old zero is no longer trusted once the carriage starts seeking
        self.homed = false;

        let procedure = Homing::new(&self.homing, &self.mechanics);
        self.progress = 0.0;
        self.activity = Activity::Homing {
            procedure,
            then_prime,
        };
        self.set_state(if then_prime.is_some() {
            ControllerState::Priming
        } else {
            ControllerState::Homing
        });
        Ok(())
    }

    fn start_jog(&mut self, distance_mm: f32, speed_mm_s: f32) -> Result<()> {
        let max_speed = self.mechanics.max_speed.0;
        let speed = speed_mm_s.clamp(MIN_JOG_SPEED_MM_S, max_speed.max(MIN_JOG_SPEED_MM_S));
        let origin_mm = self.position.mm();
        let target_mm = self.mechanics.clamp_mm(origin_mm + distance_mm);

        self.preempt();
        self.progress = 0.0;

        let mv = self.straight_move(target_mm, speed, self.mechanics.max_acceleration.0);
        if mv.target_steps == self.position.steps().0 {
            self.release();
            self.set_state(ControllerState::Idle);
            return Ok(());
        }

        self.energize()?;
        log::info!("jog: {:.2} mm -> {:.2} mm at {:.1} mm/s", origin_mm, target_mm, speed);
        self.activity = Activity::Jog(mv);
        self.set_state(ControllerState::Jogging);
        Ok(())
    }

    fn prime_plan(&self, profile: MotionProfile) -> PrimePlan {
        let start = profile.start_position().unwrap_or(0.0);
        PrimePlan {
            target_mm: self.mechanics.clamp_mm(start),
            speed: PRIME_SPEED_MM_S
                .min(profile.max_speed_mm_s)
                .min(self.mechanics.max_speed.0),
            accel: profile
                .max_accel_mm_s2
                .min(self.mechanics.max_acceleration.0),
        }
    }

    fn start_prime(&mut self, prime: PrimePlan) -> Result<()> {
        self.preempt();

        if fabsf(self.position.mm() - prime.target_mm) < PRIME_TOLERANCE_MM {
            log::info!("prime: already at {:.2} mm", prime.target_mm);
            self.progress = 1.0;
            self.release();
            self.set_state(ControllerState::Idle);
            return Ok(());
        }

        self.energize()?;
        self.progress = 0.0;
        self.activity = Activity::Prime(self.straight_move(prime.target_mm, prime.speed, prime.accel));
        self.set_state(ControllerState::Priming);
        Ok(())
    }

    fn start_run(&mut self, trajectory: Trajectory) -> Result<()> {
        self.preempt();
        self.energize()?;

        let run = Run {
            limit_mm: trajectory.length_mm().min(self.mechanics.travel_mm()),
            speed: trajectory.max_speed_mm_s().min(self.mechanics.max_speed.0),
            accel: trajectory
                .max_accel_mm_s2()
                .min(self.mechanics.max_acceleration.0),
            trajectory,
            elapsed: 0.0,
        };
        log::info!(
            "run: {} keyframes over {:.2} s",
            run.trajectory.keyframe_count(),
            run.trajectory.duration()
        );

        self.progress = 0.0;
        self.activity = Activity::Run(run);
        self.set_state(ControllerState::Running);
        Ok(())
    }

    fn straight_move(&self, target_mm: f32, speed: f32, accel: f32) -> Move {
        let origin_mm = self.position.mm();
        Move {
            origin_mm,
            target_steps: self.position.steps_for(target_mm),
            ramp: Ramp::new(target_mm - origin_mm, speed, accel),
            elapsed: 0.0,
            speed,
            accel,
        }
    }

    // ---------------------------------------------------------------------
    // Tick handlers
    // ---------------------------------------------------------------------

    fn tick_homing(
        &mut self,
        mut procedure: Homing,
        then_prime: Option<PrimePlan>,
        dt: f32,
    ) -> core::result::Result<Step, FaultReason> {
        match procedure.advance(&mut self.hal, &mut self.position, dt)? {
            HomingProgress::Running => Ok(Step::Continue(Activity::Homing {
                procedure,
                then_prime,
            })),
            HomingProgress::Homed => {
                self.position.set_origin();
                self.homed = true;
                log::info!("homing complete, position zeroed");

                match then_prime {
                    None => Ok(Step::Done),
                    Some(prime) if fabsf(prime.target_mm) < PRIME_TOLERANCE_MM => {
                        self.progress = 1.0;
                        Ok(Step::Done)
                    }
                    Some(prime) => Ok(Step::Continue(Activity::Prime(self.straight_move(
                        prime.target_mm,
                        prime.speed,
                        prime.accel,
                    )))),
                }
            }
        }
    }

    fn tick_jog(&mut self, mut mv: Move, dt: f32) -> core::result::Result<Step, FaultReason> {
        mv.elapsed += dt;
        let target = self.move_target(&mv);

        match self.follow(&target, dt, Guard::Jog)? {
            Followed::Tripped(limit) => {
                match limit {
                    Limit::Min => self.position.set_origin(),
                    Limit::Max => self.position.set_far_end(),
                }
                log::warn!("jog: {:?} endstop tripped at {:.2} mm", limit, self.position.mm());
                Ok(Step::Done)
            }
            Followed::Moved if self.arrived(&mv) => Ok(Step::Done),
            Followed::Moved => Ok(Step::Continue(Activity::Jog(mv))),
        }
    }

    fn tick_prime(&mut self, mut mv: Move, dt: f32) -> core::result::Result<Step, FaultReason> {
        mv.elapsed += dt;
        let target = self.move_target(&mv);

        match self.follow(&target, dt, Guard::Prime)? {
            Followed::Tripped(_) => Err(FaultReason::UnexpectedEndstop),
            Followed::Moved => {
                self.progress = mv.ramp.progress_at(mv.elapsed);
                if self.arrived(&mv) {
                    self.progress = 1.0;
                    Ok(Step::Done)
                } else {
                    Ok(Step::Continue(Activity::Prime(mv)))
                }
            }
        }
    }

    fn tick_run(&mut self, mut run: Run, dt: f32) -> core::result::Result<Step, FaultReason> {
        let spm = self.mechanics.steps_per_mm;
        let duration = run.trajectory.duration();
        run.elapsed += dt;

        let goal_mm = run
            .trajectory
            .position_at(run.elapsed.min(duration))
            .clamp(0.0, run.limit_mm);
        let stop_mm = run.trajectory.next_stop(run.elapsed).clamp(0.0, run.limit_mm);
        let upper = self.position.steps_for(run.limit_mm);
        let target = FollowTarget {
            goal: goal_mm * spm,
            stop: stop_mm * spm,
            upper: upper as f32,
            max_speed: run.speed * spm,
            max_accel: run.accel * spm,
        };

        if let Followed::Tripped(_) = self.follow(&target, dt, Guard::Run)? {
            return Err(FaultReason::UnexpectedEndstop);
        }

        self.progress = (run.elapsed / duration).clamp(0.0, 1.0);

        // past the end the goal holds still until the carriage settles on it
        let goal_steps = self.position.steps_for(goal_mm).min(upper);
        if run.elapsed >= duration && self.follower.settled(self.position.steps().0, goal_steps) {
            self.progress = 1.0;
            log::info!("run complete at {:.2} mm", self.position.mm());
            return Ok(Step::Done);
        }

        Ok(Step::Continue(Activity::Run(run)))
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    fn move_target(&self, mv: &Move) -> FollowTarget {
        let spm = self.mechanics.steps_per_mm;
        let goal = if mv.elapsed >= mv.ramp.duration() {
            mv.target_steps as f32
        } else {
            (mv.origin_mm + mv.ramp.offset_at(mv.elapsed)) * spm
        };
        FollowTarget {
            goal,
            stop: mv.target_steps as f32,
            upper: self.position.max_steps() as f32,
            max_speed: mv.speed * spm,
            max_accel: mv.accel * spm,
        }
    }

    fn arrived(&self, mv: &Move) -> bool {
        mv.elapsed >= mv.ramp.duration()
            && self
                .follower
                .settled(self.position.steps().0, mv.target_steps)
    }

    /// Issue one tick's worth of steps toward `target`.
    ///
    /// Endstops are polled before every step in the direction of travel.
    fn follow(
        &mut self,
        target: &FollowTarget,
        dt: f32,
        guard: Guard,
    ) -> core::result::Result<Followed, FaultReason> {
        let current = self.position.steps().0;
        let delta = self.follower.next_step(current, target, dt) - current;

        if guard == Guard::Run {
            let direction = (delta != 0).then(|| Direction::from_delta(delta));
            self.check_run_endstops(direction)?;
        }

        if delta == 0 {
            return Ok(Followed::Moved);
        }

        let direction = Direction::from_delta(delta);
        let count = delta.unsigned_abs();
        self.hal.driver.set_direction(direction)?;
        self.hal.driver.set_step_rate(count as f32 / dt);

        for _ in 0..count {
            let limit = direction.limit();
            if self.hal.triggered(limit)? {
                self.follower.reset();
                if guard == Guard::Jog {
                    return Ok(Followed::Tripped(limit));
                }
                log::error!("{:?} endstop tripped moving {:?}", limit, direction);
                return Err(FaultReason::UnexpectedEndstop);
            }
            self.hal.driver.step()?;
            self.position.move_steps(direction.sign());
        }

        Ok(Followed::Moved)
    }

    /// Fault if an endstop reads triggered while moving toward it, or away
    /// from its own end of the rail.
    fn check_run_endstops(
        &mut self,
        direction: Option<Direction>,
    ) -> core::result::Result<(), FaultReason> {
        let pos = self.position.mm();
        for limit in [Limit::Min, Limit::Max] {
            if !self.hal.triggered(limit)? {
                continue;
            }
            let toward = direction.map(Direction::limit) == Some(limit);
            let at_end = match limit {
                Limit::Min => pos <= ENDSTOP_ZONE_MM,
                Limit::Max => pos >= self.mechanics.travel_mm() - ENDSTOP_ZONE_MM,
            };
            if toward || !at_end {
                log::error!("unexpected {:?} endstop at {:.2} mm", limit, pos);
                return Err(FaultReason::UnexpectedEndstop);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            log::debug!("state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn energize(&mut self) -> Result<()> {
        if let Err(e) = self.hal.driver.enable(true) {
            self.fault(FaultReason::HardwareFault);
            return Err(e.into());
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.hal.driver.enable(false) {
            log::warn!("failed to release driver: {}", e);
        }
    }

    fn finish(&mut self) {
        self.activity = Activity::None;
        self.follower.reset();
        self.release();
        self.set_state(ControllerState::Idle);
    }

    fn fault(&mut self, reason: FaultReason) {
        log::error!("fault in {:?}: {}", self.state, reason);
        self.activity = Activity::None;
        self.follower.reset();
        self.homed = false;
        self.release();
        self.set_state(ControllerState::Error(reason));
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::config::{Microsteps, Millimeters};
    use crate::error::Error;
    use crate::hal::{SimDriver, SimEndstop, Simulator};
    use crate::motion::{EasingSpec, ProfileBuilder};
    use proptest::prelude::*;

    const DT: f32 = 0.02;

    /// 10 steps/mm on a 1200 mm rail keeps step counts small.
    fn config() -> SliderConfig {
        let mut config = SliderConfig::default();
        config.mechanics.microsteps = Microsteps::FULL;
        config.mechanics.lead = Millimeters(20.0);
        config
    }

    fn controller_at(start_mm: f32) -> (Controller<SimDriver, SimEndstop>, Simulator) {
        let config = config();
        let sim = Simulator::new(&config).with_start_mm(start_mm);
        (Controller::new(sim.hal(), &config), sim)
    }

    fn settle(c: &mut Controller<SimDriver, SimEndstop>, max_ticks: usize) {
        for _ in 0..max_ticks {
            c.tick(DT);
            if !c.state().is_moving() {
                return;
            }
        }
        panic!("still {:?} after {} ticks", c.state(), max_ticks);
    }

    fn homed() -> (Controller<SimDriver, SimEndstop>, Simulator) {
        let (mut c, sim) = controller_at(0.0);
        c.submit(Command::Home).unwrap();
        settle(&mut c, 1_000);
        assert!(c.is_homed());
        (c, sim)
    }

    fn jog_to(c: &mut Controller<SimDriver, SimEndstop>, mm: f32) {
        let distance_mm = mm - c.position_mm();
        c.submit(Command::Jog {
            distance_mm,
            speed_mm_s: 120.0,
        })
        .unwrap();
        settle(c, 5_000);
    }

    fn eased_profile() -> MotionProfile {
        ProfileBuilder::new()
            .length(1200.0)
            .keyframe(0.0, 0.0)
            .eased_keyframe(4.0, 400.0, EasingSpec::cubic_bezier(0.25, 0.1, 0.25, 1.0))
            .keyframe(7.0, 600.0)
            .build()
            .unwrap()
    }

    fn slow_profile() -> MotionProfile {
        ProfileBuilder::new()
            .length(1200.0)
            .keyframe(0.0, 100.0)
            .keyframe(10.0, 600.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_initial_status() {
        let (c, sim) = controller_at(0.0);
        assert_eq!(
            c.status(),
            SliderStatus {
                state: ControllerState::Idle,
                pos_mm: 0.0,
                homed: false,
                progress: 0.0,
            }
        );
        assert!(!sim.is_enabled());
    }

    #[test]
    fn test_home_from_mid_rail() {
        let (mut c, sim) = controller_at(450.0);
        c.submit(Command::Home).unwrap();
        assert_eq!(c.state(), ControllerState::Homing);

        settle(&mut c, 5_000);
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(c.is_homed());
        assert_eq!(c.position_mm(), 0.0);
        assert_eq!(sim.position_steps(), 0);
        assert!(!sim.is_enabled());
    }

    #[test]
    fn test_interrupted_home_clears_homed() {
        let (mut c, sim) = homed();
        jog_to(&mut c, 600.0);

        c.submit(Command::Home).unwrap();
        assert!(!c.is_homed());
        for _ in 0..250 {
            c.tick(DT);
            assert_eq!(c.position_mm(), sim.position_mm());
        }
        assert_eq!(c.state(), ControllerState::Homing);
        assert!(c.position_mm() < 600.0);

        c.submit(Command::Stop).unwrap();
        c.tick(DT);
        let status = c.status();
        assert_eq!(status.state, ControllerState::Idle);
        assert!(!status.homed);
        assert_eq!(status.pos_mm, sim.position_mm());
        assert_eq!(
            c.submit(Command::Run(eased_profile())),
            Err(Error::Motion(MotionError::NotHomed))
        );
    }

    #[test]
    fn test_preempted_home_clears_homed() {
        let (mut c, sim) = homed();
        jog_to(&mut c, 300.0);
        c.submit(Command::Home).unwrap();
        for _ in 0..50 {
            c.tick(DT);
        }

        c.submit(Command::Jog {
            distance_mm: 10.0,
            speed_mm_s: 20.0,
        })
        .unwrap();
        settle(&mut c, 1_000);
        assert!(!c.is_homed());
        assert_eq!(c.position_mm(), sim.position_mm());
    }

    #[test]
    fn test_homing_timeout() {
        let (mut c, sim) = controller_at(600.0);
        sim.disconnect_endstop(Limit::Min, true);
        c.submit(Command::Home).unwrap();
        settle(&mut c, 10_000);

        assert_eq!(c.state(), ControllerState::Error(FaultReason::HomingTimeout));
        assert!(!c.is_homed());
        assert!(!sim.is_enabled());
    }

    #[test]
    fn test_jog_clamps_to_travel() {
        let (mut c, sim) = homed();
        jog_to(&mut c, 1180.0);
        assert_eq!(c.position_mm(), 1180.0);

        c.submit(Command::Jog {
            distance_mm: 50.0,
            speed_mm_s: 50.0,
        })
        .unwrap();
        settle(&mut c, 1_000);

        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.position_mm(), 1200.0);
        assert_eq!(sim.position_mm(), 1200.0);
    }

    #[test]
    fn test_jog_speed_clamped() {
        let (mut c, _sim) = homed();
        c.submit(Command::Jog {
            distance_mm: 100.0,
            speed_mm_s: 5_000.0,
        })
        .unwrap();

        let mut last = c.position_mm();
        while c.state().is_moving() {
            c.tick(DT);
            let pos = c.position_mm();
            // 120 mm/s cap over one 20 ms tick, plus one step of rounding
            assert!(pos - last <= 120.0 * DT + 0.1 + 1e-3);
            last = pos;
        }
        assert_eq!(c.position_mm(), 100.0);
    }

    #[test]
    fn test_jog_endstop_resyncs_position() {
        // unhomed estimate is 0 while the carriage really sits at 900 mm
        let (mut c, sim) = controller_at(900.0);
        c.submit(Command::Jog {
            distance_mm: 600.0,
            speed_mm_s: 120.0,
        })
        .unwrap();
        settle(&mut c, 5_000);

        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.position_mm(), 1200.0);
        assert_eq!(sim.position_mm(), 1200.0);
    }

    #[test]
    fn test_run_requires_homing() {
        let (mut c, sim) = controller_at(0.0);
        let before = c.status();

        let err = c.submit(Command::Run(eased_profile())).unwrap_err();
        assert_eq!(err, Error::Motion(MotionError::NotHomed));
        assert_eq!(c.status(), before);
        assert_eq!(sim.steps_issued(), 0);
    }

    #[test]
    fn test_invalid_profile_leaves_state() {
        let (mut c, _sim) = homed();
        c.submit(Command::Run(slow_profile())).unwrap();
        for _ in 0..10 {
            c.tick(DT);
        }
        let before = c.status();

        let mut bad = slow_profile();
        bad.keyframes[1].t = 0.0;
        assert!(c.submit(Command::Run(bad)).unwrap_err().is_invalid_profile());
        assert_eq!(c.status(), before);
        assert_eq!(c.state(), ControllerState::Running);
    }

    #[test]
    fn test_run_completes() {
        let (mut c, _sim) = homed();
        c.submit(Command::Run(eased_profile())).unwrap();
        assert_eq!(c.state(), ControllerState::Running);

        let mut ticks = 0;
        while c.state() == ControllerState::Running {
            c.tick(DT);
            ticks += 1;
            assert!(c.status().progress <= 1.0);
        }

        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.status().progress, 1.0);
        // 7 s of curve plus braking onto the last keyframe
        assert!((350..=380).contains(&ticks), "run took {} ticks", ticks);
        assert_eq!(c.position_mm(), 600.0);
    }

    #[test]
    fn test_run_respects_speed_cap() {
        let (mut c, _sim) = homed();
        let profile = ProfileBuilder::new()
            .length(1200.0)
            .keyframe(0.0, 0.0)
            .keyframe(1.0, 1000.0)
            .max_speed(60.0)
            .build()
            .unwrap();
        c.submit(Command::Run(profile)).unwrap();

        let mut last = c.position_mm();
        let mut ticks = 0;
        while c.state() == ControllerState::Running {
            c.tick(DT);
            let pos = c.position_mm();
            assert!(pos - last <= 60.0 * DT + 0.1 + 1e-3);
            last = pos;
            ticks += 1;
        }
        // the carriage falls behind the 1 s curve and finishes late
        assert!(ticks as f32 * DT >= 1000.0 / 60.0);
        assert_eq!(c.position_mm(), 1000.0);
    }

    #[test]
    fn test_run_respects_accel_cap_through_hold() {
        let (mut c, sim) = homed();
        let profile = ProfileBuilder::new()
            .length(1200.0)
            .keyframe(0.0, 0.0)
            .keyframe(1.0, 100.0)
            .keyframe(1.1, 100.0)
            .keyframe(2.1, 200.0)
            .build()
            .unwrap();
        c.submit(Command::Run(profile)).unwrap();

        let mut positions = vec![sim.position_mm()];
        while c.state() == ControllerState::Running {
            c.tick(DT);
            positions.push(sim.position_mm());
        }
        let speeds: Vec<f32> = positions.windows(2).map(|w| (w[1] - w[0]) / DT).collect();

        // 300 mm/s^2 over one tick, plus a step of rounding on each side
        let step_speed = 0.1 / DT;
        for w in speeds.windows(2) {
            assert!(
                (w[1] - w[0]).abs() <= 300.0 * DT + 2.0 * step_speed + 1e-3,
                "speed jumped {} -> {} mm/s",
                w[0],
                w[1]
            );
        }
        assert!(speeds.iter().all(|v| v.abs() <= 120.0 + step_speed + 1e-3));
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.position_mm(), 200.0);
        assert_eq!(sim.position_mm(), 200.0);
    }

    #[test]
    fn test_max_endstop_during_run_faults() {
        let (mut c, sim) = homed();
        c.submit(Command::Run(eased_profile())).unwrap();
        for _ in 0..50 {
            c.tick(DT);
        }
        assert_eq!(c.state(), ControllerState::Running);

        sim.force_endstop(Limit::Max, true);
        c.tick(DT);
        assert_eq!(c.state(), ControllerState::Error(FaultReason::UnexpectedEndstop));

        let issued = sim.steps_issued();
        for _ in 0..50 {
            c.tick(DT);
        }
        assert_eq!(sim.steps_issued(), issued);
        assert!(!sim.is_enabled());
        assert!(!c.is_homed());
    }

    #[test]
    fn test_min_endstop_at_home_is_expected() {
        // the run starts on the min endstop and leaves it
        let (mut c, _sim) = homed();
        c.submit(Command::Run(eased_profile())).unwrap();
        for _ in 0..20 {
            c.tick(DT);
        }
        assert_eq!(c.state(), ControllerState::Running);
    }

    #[test]
    fn test_error_accepts_only_home_or_stop() {
        let (mut c, sim) = homed();
        c.submit(Command::Run(eased_profile())).unwrap();
        c.tick(DT);
        sim.force_endstop(Limit::Max, true);
        c.tick(DT);
        let reason = FaultReason::UnexpectedEndstop;
        assert_eq!(c.state(), ControllerState::Error(reason));

        let jog = Command::Jog {
            distance_mm: 10.0,
            speed_mm_s: 10.0,
        };
        assert_eq!(c.submit(jog), Err(MotionError::Faulted(reason).into()));
        assert_eq!(
            c.submit(Command::Prime(eased_profile())),
            Err(MotionError::Faulted(reason).into())
        );

        sim.force_endstop(Limit::Max, false);
        c.submit(Command::Home).unwrap();
        settle(&mut c, 5_000);
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(c.is_homed());
    }

    #[test]
    fn test_stop_clears_error() {
        let (mut c, sim) = controller_at(600.0);
        sim.disconnect_endstop(Limit::Min, true);
        c.submit(Command::Home).unwrap();
        settle(&mut c, 10_000);
        assert!(c.state().fault().is_some());

        c.submit(Command::Stop).unwrap();
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[test]
    fn test_stop_idempotent_from_idle() {
        let (mut c, sim) = homed();
        jog_to(&mut c, 200.0);
        let before = c.status();

        for _ in 0..5 {
            c.submit(Command::Stop).unwrap();
            c.tick(DT);
            assert_eq!(c.status(), before);
        }
        assert_eq!(sim.position_mm(), 200.0);
    }

    #[test]
    fn test_stop_halts_within_one_tick() {
        let (mut c, sim) = homed();
        c.submit(Command::Run(eased_profile())).unwrap();
        for _ in 0..30 {
            c.tick(DT);
        }

        c.submit(Command::Stop).unwrap();
        assert_eq!(c.state(), ControllerState::Stopping);
        assert!(!sim.is_enabled());
        let issued = sim.steps_issued();

        c.tick(DT);
        assert_eq!(c.state(), ControllerState::Idle);
        c.tick(DT);
        assert_eq!(sim.steps_issued(), issued);
    }

    #[test]
    fn test_motion_command_preempts() {
        let (mut c, _sim) = homed();
        c.submit(Command::Run(slow_profile())).unwrap();
        for _ in 0..100 {
            c.tick(DT);
        }
        let pos = c.position_mm();

        c.submit(Command::Jog {
            distance_mm: -20.0,
            speed_mm_s: 40.0,
        })
        .unwrap();
        assert_eq!(c.state(), ControllerState::Jogging);
        settle(&mut c, 1_000);

        assert_eq!(c.state(), ControllerState::Idle);
        assert!((c.position_mm() - (pos - 20.0)).abs() < 0.11);
    }

    #[test]
    fn test_prime_moves_to_start() {
        let (mut c, _sim) = homed();
        c.submit(Command::Prime(slow_profile())).unwrap();
        assert_eq!(c.state(), ControllerState::Priming);

        let mut last = c.position_mm();
        while c.state() == ControllerState::Priming {
            c.tick(DT);
            let pos = c.position_mm();
            assert!(pos - last <= PRIME_SPEED_MM_S * DT + 0.1 + 1e-3);
            last = pos;
        }

        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.position_mm(), 100.0);
        assert_eq!(c.status().progress, 1.0);
    }

    #[test]
    fn test_prime_skips_when_at_start() {
        let (mut c, sim) = homed();
        jog_to(&mut c, 100.2);
        let issued = sim.steps_issued();

        c.submit(Command::Prime(slow_profile())).unwrap();
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(!sim.is_enabled());
        for _ in 0..10 {
            c.tick(DT);
        }
        assert_eq!(sim.steps_issued(), issued);
    }

    #[test]
    fn test_prime_homes_first() {
        let (mut c, sim) = controller_at(700.0);
        c.submit(Command::Prime(slow_profile())).unwrap();
        assert_eq!(c.state(), ControllerState::Priming);

        settle(&mut c, 10_000);
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(c.is_homed());
        assert_eq!(c.position_mm(), 100.0);
        assert_eq!(sim.position_mm(), 100.0);
    }

    #[test]
    fn test_hardware_fault_during_jog() {
        let (mut c, sim) = homed();
        c.submit(Command::Jog {
            distance_mm: 100.0,
            speed_mm_s: 50.0,
        })
        .unwrap();
        c.tick(DT);

        sim.inject_fault(true);
        c.tick(DT);
        assert_eq!(c.state(), ControllerState::Error(FaultReason::HardwareFault));
    }

    #[test]
    fn test_bad_tick_ignored() {
        let (mut c, sim) = homed();
        c.submit(Command::Run(slow_profile())).unwrap();
        let issued = sim.steps_issued();
        c.tick(f32::NAN);
        c.tick(-1.0);
        c.tick(0.0);
        assert_eq!(sim.steps_issued(), issued);
        assert_eq!(c.state(), ControllerState::Running);
    }

    #[test]
    fn test_non_finite_jog_rejected() {
        let (mut c, _sim) = homed();
        let jog = Command::Jog {
            distance_mm: f32::INFINITY,
            speed_mm_s: 10.0,
        };
        assert_eq!(c.submit(jog), Err(MotionError::InvalidJog.into()));
        assert_eq!(c.state(), ControllerState::Idle);
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::Home),
            Just(Command::Stop),
            (-1500.0f32..1500.0, 0.0f32..200.0).prop_map(|(distance_mm, speed_mm_s)| {
                Command::Jog {
                    distance_mm,
                    speed_mm_s,
                }
            }),
            Just(Command::Prime(slow_profile())),
            Just(Command::Run(eased_profile())),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_position_stays_on_rail(
            start in 0.0f32..=1200.0,
            script in prop::collection::vec((arb_command(), 1usize..40, 0.005f32..0.1), 1..12),
        ) {
            let (mut c, sim) = controller_at(start);
            for (command, ticks, dt) in script {
                let _ = c.submit(command);
                for _ in 0..ticks {
                    c.tick(dt);
                    let pos = c.position_mm();
                    prop_assert!((0.0..=1200.0).contains(&pos), "pos {} out of rail", pos);
                    let real = sim.position_mm();
                    prop_assert!((0.0..=1200.0).contains(&real), "carriage {} off rail", real);
                }
            }
        }
    }
}
