pub mod mock_output;
pub mod pigpio;
pub mod pwm_output;
pub mod servo_output;

use crate::settings::{GpioLibrary, OutputSettings};
use std::{fmt::Debug, result};
use thiserror::Error;

pub use mock_output::{MockOutput, MockOutputFactory, OutputCall, OutputJournal};
pub use pigpio::{PigpioClient, PigpioError};
pub use pwm_output::PwmOutput;
pub use servo_output::ServoOutput;

pub type Result<T> = result::Result<T, OutputError>;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("pigpio daemon: {0}")]
    Pigpio(#[from] PigpioError),
    #[error("pwm channel: {0}")]
    Pwm(#[from] rppal::pwm::Error),
    #[error("output rejected {value}: {reason}")]
    Rejected { value: f64, reason: String },
    #[error("output is not driven")]
    Stopped,
}

/// Native value range of an output, `min < max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputRange {
    pub min: f64,
    pub max: f64,
}

impl OutputRange {
    pub const fn new(min: f64, max: f64) -> Self {
        OutputRange { min, max }
    }
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// A single hardware channel driving the spindle.
pub trait Output: Debug + Send {
    fn range(&self) -> OutputRange;
    /**
     * value written when the spindle is stopped
     */
    fn disable_value(&self) -> f64 {
        self.range().min
    }
    fn set(&mut self, value: f64) -> Result<()>;
    /**
     * value the channel currently drives
     */
    fn applied(&mut self) -> Result<f64>;
    /**
     * release the channel, no further writes are expected
     */
    fn stop(&mut self) -> Result<()>;
}

/// Builds the output for a session. The new output already drives `initial_value`.
pub trait OutputFactory: Send {
    fn create(&self, settings: &OutputSettings) -> Result<Box<dyn Output>>;
}

/// Picks the output variant from `gpio_library`. In dev mode a mock stands in for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct GpioOutputFactory;

impl OutputFactory for GpioOutputFactory {
    fn create(&self, settings: &OutputSettings) -> Result<Box<dyn Output>> {
        let output: Box<dyn Output> = match settings.gpio_library {
            GpioLibrary::Pigpio if !settings.dev_mode => Box::new(ServoOutput::connect(settings)?),
            GpioLibrary::Rppal if !settings.dev_mode => Box::new(PwmOutput::new(settings)?),
            _ => Box::new(MockOutput::new(
                settings.range(),
                settings.initial_value,
                OutputJournal::default(),
            )),
        };
        log::info!(
            "init {:?} output{}, range [{}, {}]",
            settings.gpio_library,
            if settings.dev_mode { " (mock)" } else { "" },
            output.range().min,
            output.range().max
        );
        Ok(output)
    }
}
