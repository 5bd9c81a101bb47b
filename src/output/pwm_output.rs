use super::{Output, OutputError, OutputRange, Result};
use crate::settings::OutputSettings;
use rppal::pwm::{Channel, Polarity, Pwm};

/// Hardware PWM channel, the value is the duty cycle.
#[derive(Debug)]
pub struct PwmOutput {
    pwm: Pwm,
    range: OutputRange,
}

impl PwmOutput {
    pub fn new(settings: &OutputSettings) -> Result<Self> {
        let channel = match settings.pwm_channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => {
                return Err(OutputError::Rejected {
                    value: other as f64,
                    reason: String::from("no such pwm channel"),
                })
            }
        };
        let range = settings.range();
        let pwm = Pwm::with_frequency(
            channel,
            1.0 / settings.frame_width,
            range.clamp(settings.initial_value),
            Polarity::Normal,
            true,
        )?;
        log::debug!(
            "pwm {:?} at {}Hz, duty [{}, {}]",
            channel,
            1.0 / settings.frame_width,
            range.min,
            range.max
        );
        Ok(PwmOutput { pwm, range })
    }
}

impl Output for PwmOutput {
    fn range(&self) -> OutputRange {
        self.range
    }
    fn set(&mut self, value: f64) -> Result<()> {
        let duty_cycle = self.range.clamp(value);
        log::debug!("pwm duty cycle -> {}", duty_cycle);
        self.pwm.set_duty_cycle(duty_cycle)?;
        Ok(())
    }
    fn applied(&mut self) -> Result<f64> {
        if !self.pwm.is_enabled()? {
            return Err(OutputError::Stopped);
        }
        Ok(self.pwm.duty_cycle()?)
    }
    fn stop(&mut self) -> Result<()> {
        self.pwm.disable()?;
        Ok(())
    }
}
