//! Background control loop.
//!
//! [`ControllerHandle`] moves a [`Controller`] onto its own thread. Commands
//! arrive over a bounded channel and are applied in arrival order between
//! ticks. The latest [`SliderStatus`] is published after every tick and
//! after every command, before its reply is sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SliderConfig;
use crate::error::{MotionError, Result};
use crate::hal::{Endstop, Hal, StepperDriver};
use crate::motion::MotionProfile;

use super::command::Command;
use super::machine::Controller;
use super::state::SliderStatus;

struct Request {
    command: Command,
    reply: mpsc::Sender<Result<()>>,
}

/// Thread-safe handle to a running controller.
pub struct ControllerHandle {
    requests: SyncSender<Request>,
    status: Arc<RwLock<SliderStatus>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Start the control loop on a thread named `slider-control`.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the thread cannot be spawned.
    pub fn spawn<D, E>(hal: Hal<D, E>, config: &SliderConfig) -> Result<Self>
    where
        D: StepperDriver + Send + 'static,
        E: Endstop + Send + 'static,
    {
        let controller = Controller::new(hal, config);
        let period = Duration::from_millis(u64::from(config.controller.tick_period_ms));
        let (requests, inbox) = mpsc::sync_channel(config.controller.command_queue_depth);
        let status = Arc::new(RwLock::new(controller.status()));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let status = Arc::clone(&status);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("slider-control".into())
                .spawn(move || control_loop(controller, inbox, status, running, period))
                .map_err(|e| {
                    log::error!("failed to spawn control thread: {}", e);
                    MotionError::Disconnected
                })?
        };

        log::info!("control loop started ({} ms tick)", period.as_millis());
        Ok(Self {
            requests,
            status,
            running,
            thread: Some(thread),
        })
    }

    /// Queue a command and wait for the controller to accept or reject it.
    ///
    /// Blocks while the queue is full.
    pub fn submit(&self, command: Command) -> Result<()> {
        let (reply, outcome) = mpsc::channel();
        self.requests
            .send(Request { command, reply })
            .map_err(|_| MotionError::Disconnected)?;
        outcome.recv().map_err(|_| MotionError::Disconnected)?
    }

    /// Home against the min endstop.
    pub fn home(&self) -> Result<()> {
        self.submit(Command::Home)
    }

    /// Relative move.
    pub fn jog(&self, distance_mm: f32, speed_mm_s: f32) -> Result<()> {
        self.submit(Command::Jog {
            distance_mm,
            speed_mm_s,
        })
    }

    /// Move to the profile's start position.
    pub fn prime(&self, profile: MotionProfile) -> Result<()> {
        self.submit(Command::Prime(profile))
    }

    /// Execute a profile.
    pub fn run(&self, profile: MotionProfile) -> Result<()> {
        self.submit(Command::Run(profile))
    }

    /// Halt all motion.
    pub fn stop(&self) -> Result<()> {
        self.submit(Command::Stop)
    }

    /// Latest published status.
    pub fn status(&self) -> SliderStatus {
        match self.status.read() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Whether the control loop is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the control loop and wait for it to exit.
    ///
    /// The carriage is halted and the driver released on the way out.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("control thread panicked");
            }
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish(status: &RwLock<SliderStatus>, snapshot: SliderStatus) {
    match status.write() {
        Ok(mut slot) => *slot = snapshot,
        Err(poisoned) => *poisoned.into_inner() = snapshot,
    }
}

fn control_loop<D: StepperDriver, E: Endstop>(
    mut controller: Controller<D, E>,
    inbox: Receiver<Request>,
    status: Arc<RwLock<SliderStatus>>,
    running: Arc<AtomicBool>,
    period: Duration,
) {
    let mut last = Instant::now();
    let mut deadline = last + period;

    'outer: while running.load(Ordering::SeqCst) {
        loop {
            match inbox.try_recv() {
                Ok(Request { command, reply }) => {
                    let outcome = controller.submit(command);
                    if let Err(e) = &outcome {
                        log::warn!("command rejected: {}", e);
                    }
                    // published before the reply so callers never read a stale state
                    publish(&status, controller.status());
                    // the caller may have given up waiting
                    let _ = reply.send(outcome);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'outer,
            }
        }

        let now = Instant::now();
        controller.tick(now.duration_since(last).as_secs_f32());
        last = now;
        publish(&status, controller.status());

        let now = Instant::now();
        if let Some(remaining) = deadline.checked_duration_since(now) {
            thread::sleep(remaining);
            deadline += period;
        } else {
            log::trace!("tick overrun by {:?}", now - deadline);
            deadline = now + period;
        }
    }

    controller.stop();
    publish(&status, controller.status());
    log::info!("control loop stopped");
}
