use super::pigpio::PigpioClient;
use super::{Output, OutputError, OutputRange, Result};
use crate::settings::OutputSettings;
use std::{
    fmt::Debug,
    io::{Read, Write},
    net::TcpStream,
    time::Duration,
};

const PIGPIO_TIMEOUT: Duration = Duration::from_secs(2);
const SERVO_RANGE: OutputRange = OutputRange::new(-1.0, 1.0);

/// Hobby servo on a pigpio daemon GPIO.
///
/// Values run from -1 (min pulse width) to 1 (max pulse width), one pulse per frame.
#[derive(Debug)]
pub struct ServoOutput<S: Read + Write = TcpStream> {
    client: PigpioClient<S>,
    gpio: u8,
    min_pulse_width: f64,
    max_pulse_width: f64,
    value: Option<f64>,
}

impl ServoOutput<TcpStream> {
    pub fn connect(settings: &OutputSettings) -> Result<Self> {
        let client =
            PigpioClient::connect(&settings.pigpio_host, settings.pigpio_port, PIGPIO_TIMEOUT)?;
        ServoOutput::with_client(client, settings)
    }
}

impl<S: Read + Write> ServoOutput<S> {
    pub fn with_client(client: PigpioClient<S>, settings: &OutputSettings) -> Result<Self> {
        let mut servo = ServoOutput {
            client,
            gpio: settings.gpio_pin,
            min_pulse_width: settings.min_pulse_width,
            max_pulse_width: settings.max_pulse_width,
            value: None,
        };
        let frequency = (1.0 / settings.frame_width).round() as u32;
        servo.client.set_mode_output(servo.gpio)?;
        let selected = servo.client.set_pwm_frequency(servo.gpio, frequency)?;
        if selected != frequency {
            log::warn!(
                "pigpio selected {}Hz instead of {}Hz for gpio {}",
                selected,
                frequency,
                servo.gpio
            );
        }
        servo.write(settings.initial_value)?;
        Ok(servo)
    }

    fn pulse_width_us(&self, value: f64) -> u32 {
        let ratio = (value + 1.0) / 2.0;
        let seconds = self.min_pulse_width + ratio * (self.max_pulse_width - self.min_pulse_width);
        (seconds * 1e6).round() as u32
    }

    fn value_for_pulse(&self, pulse_us: u32) -> f64 {
        let seconds = pulse_us as f64 / 1e6;
        let ratio = (seconds - self.min_pulse_width) / (self.max_pulse_width - self.min_pulse_width);
        SERVO_RANGE.clamp(ratio * 2.0 - 1.0)
    }

    fn write(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(OutputError::Rejected {
                value,
                reason: String::from("not a finite servo value"),
            });
        }
        let value = SERVO_RANGE.clamp(value);
        let pulse = self.pulse_width_us(value);
        log::debug!("servo gpio {} -> {} ({}us)", self.gpio, value, pulse);
        self.client.set_servo_pulsewidth(self.gpio, pulse)?;
        self.value = Some(value);
        Ok(())
    }
}

impl<S: Read + Write + Debug + Send> Output for ServoOutput<S> {
    fn range(&self) -> OutputRange {
        SERVO_RANGE
    }
    fn set(&mut self, value: f64) -> Result<()> {
        self.write(value)
    }
    fn applied(&mut self) -> Result<f64> {
        let pulse = self.client.get_servo_pulsewidth(self.gpio)?;
        if pulse == 0 {
            return Err(OutputError::Stopped);
        }
        // report the written value when the daemon still drives its pulse, avoids rounding noise
        match self.value {
            Some(value) if self.pulse_width_us(value) == pulse => Ok(value),
            _ => Ok(self.value_for_pulse(pulse)),
        }
    }
    fn stop(&mut self) -> Result<()> {
        log::debug!("servo gpio {} off", self.gpio);
        self.client.set_servo_pulsewidth(self.gpio, 0)?;
        self.value = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::pigpio::{test_stream::ScriptedStream, CMD_GPW, CMD_MODES, CMD_PFS, CMD_SERVO};
    use crate::settings::Settings;

    fn servo(replies: &[(u32, i32)]) -> ServoOutput<ScriptedStream> {
        let mut script = vec![(CMD_MODES, 0), (CMD_PFS, 50), (CMD_SERVO, 0)];
        script.extend_from_slice(replies);
        let client = PigpioClient::from_stream(ScriptedStream::new(&script));
        let settings = Settings {
            servo_min_pulse_width: 0.001,
            servo_max_pulse_width: 0.002,
            ..Settings::default()
        };
        ServoOutput::with_client(client, &settings.output_settings()).unwrap()
    }

    #[test]
    fn initializes_channel_and_initial_value() {
        let servo = servo(&[]);
        assert_eq!(
            servo.client.stream().requests(),
            vec![(CMD_MODES, 26, 1), (CMD_PFS, 26, 50), (CMD_SERVO, 26, 1000)]
        );
    }

    #[test]
    fn maps_values_to_pulse_widths() {
        let mut servo = servo(&[(CMD_SERVO, 0), (CMD_SERVO, 0), (CMD_SERVO, 0)]);
        servo.set(0.0).unwrap();
        servo.set(1.0).unwrap();
        servo.set(5.0).unwrap();
        let requests = servo.client.stream().requests();
        assert_eq!(
            &requests[3..],
            &[(CMD_SERVO, 26, 1500), (CMD_SERVO, 26, 2000), (CMD_SERVO, 26, 2000)]
        );
    }

    #[test]
    fn reports_applied_value() {
        let mut servo = servo(&[(CMD_GPW, 1000), (CMD_GPW, 1750)]);
        assert_eq!(servo.applied().unwrap(), -1.0);
        assert!((servo.applied().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stop_switches_pulses_off() {
        let mut servo = servo(&[(CMD_SERVO, 0), (CMD_GPW, 0)]);
        servo.stop().unwrap();
        assert_eq!(servo.client.stream().requests()[3], (CMD_SERVO, 26, 0));
        assert!(matches!(servo.applied(), Err(OutputError::Stopped)));
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut servo = servo(&[]);
        assert!(matches!(
            servo.set(f64::NAN),
            Err(OutputError::Rejected { .. })
        ));
    }
}
