//! Startup selection between the GPIO and simulator variants.

use core::fmt;

use crate::config::SliderConfig;
use crate::error::Result;

use super::{DynHal, Endstop, Hal, Simulator, StepperDriver};

/// Which hardware variant is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalKind {
    /// Real GPIO lines.
    Gpio,
    /// Virtual carriage.
    Simulator,
}

impl fmt::Display for HalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalKind::Gpio => write!(f, "gpio"),
            HalKind::Simulator => write!(f, "simulator"),
        }
    }
}

/// Open the GPIO variant, falling back to the simulator if the platform
/// has no usable GPIO.
///
/// `open` is the platform-specific constructor (typically wrapping
/// [`GpioHardwareBuilder`](super::GpioHardwareBuilder)). Selection happens
/// once; the controller never inspects the variant afterwards.
pub fn probe<F, D, E>(config: &SliderConfig, open: F) -> (DynHal, HalKind)
where
    F: FnOnce(&SliderConfig) -> Result<Hal<D, E>>,
    D: StepperDriver + Send + 'static,
    E: Endstop + Send + 'static,
{
    match open(config) {
        Ok(hal) => {
            log::info!("Using GPIO hardware");
            (hal.boxed(), HalKind::Gpio)
        }
        Err(e) => {
            log::info!("Falling back to simulator: {}", e);
            (Simulator::new(config).hal().boxed(), HalKind::Simulator)
        }
    }
}
