use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

use crate::command::{CommandInterpreter, CommandTokens};
use crate::output::OutputRange;
use crate::range_mapper::SpeedWindow;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("can not access settings file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("speed window is degenerate: minimum_speed {min} must be below maximum_speed {max}")]
    DegenerateWindow { min: f64, max: f64 },
    #[error("{name}: minimum {min} must be below maximum {max}")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("servo_initial_value {value} is outside of the output range [{min}, {max}]")]
    InitialValueOutOfRange { value: f64, min: f64, max: f64 },
    #[error("{name} must be a positive finite number, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("pwm_channel {0} does not exist, use 0 or 1")]
    InvalidPwmChannel(u8),
    #[error("{0} must not be empty")]
    EmptyToken(&'static str),
}

/// Output back end selected once at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioLibrary {
    /// servo pulses through a remote pigpio daemon
    Pigpio,
    /// hardware PWM channel of the local SoC
    Rppal,
    Mock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub dev_mode: bool,
    pub gpio_library: GpioLibrary,
    pub servo_initial_value: f64,
    // seconds
    pub servo_min_pulse_width: f64,
    pub servo_max_pulse_width: f64,
    pub servo_frame_width: f64,
    pub servo_gpio_pin: u8,
    pub pigpio_host: String,
    pub pigpio_port: u16,
    pub minimum_speed: f64,
    pub maximum_speed: f64,
    pub pwm_channel: u8,
    pub servo_min_duty_cycle: f64,
    pub servo_max_duty_cycle: f64,
    #[serde(default = "default_stop_token")]
    pub stop_token: String,
    #[serde(default = "default_start_token")]
    pub start_token: String,
    #[serde(default = "default_speed_prefix")]
    pub speed_prefix: char,
}

fn default_stop_token() -> String {
    CommandTokens::default().stop
}
fn default_start_token() -> String {
    CommandTokens::default().start
}
fn default_speed_prefix() -> char {
    CommandTokens::default().speed_prefix
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            gpio_library: GpioLibrary::Pigpio,
            servo_initial_value: -1.0f64,
            servo_min_pulse_width: 0.001128f64,
            servo_max_pulse_width: 0.002f64,
            servo_frame_width: 0.02f64,
            servo_gpio_pin: 26,
            pigpio_host: String::from("octopi-zero2"),
            pigpio_port: 32000,
            minimum_speed: 0.0f64,
            maximum_speed: 10000.0f64,
            pwm_channel: 0,
            servo_min_duty_cycle: 0.05f64,
            servo_max_duty_cycle: 0.10f64,
            stop_token: default_stop_token(),
            start_token: default_start_token(),
            speed_prefix: default_speed_prefix(),
        }
    }
}

/// The part of the settings an output back end is built from.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSettings {
    /// build a mock with the range of `gpio_library` instead of touching hardware
    pub dev_mode: bool,
    pub gpio_library: GpioLibrary,
    pub initial_value: f64,
    pub min_pulse_width: f64,
    pub max_pulse_width: f64,
    pub frame_width: f64,
    pub gpio_pin: u8,
    pub pigpio_host: String,
    pub pigpio_port: u16,
    pub pwm_channel: u8,
    pub min_duty_cycle: f64,
    pub max_duty_cycle: f64,
}

impl OutputSettings {
    /// Native value range of the configured back end, also used by the dev mode mock.
    pub fn range(&self) -> OutputRange {
        match self.gpio_library {
            GpioLibrary::Rppal => OutputRange::new(self.min_duty_cycle, self.max_duty_cycle),
            GpioLibrary::Pigpio | GpioLibrary::Mock => OutputRange::new(-1.0, 1.0),
        }
    }
}

impl Settings {
    pub fn from_file(file_path: &str) -> Result<Settings, SettingsError> {
        let settings = if Path::new(file_path).exists() {
            let data = fs::read_to_string(file_path)?;
            serde_yaml::from_str(&data)?
        } else {
            log::info!("no settings at {}, writing defaults", file_path);
            let s = Settings::default();
            s.write_to_file(file_path)?;
            s
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn command_tokens(&self) -> CommandTokens {
        CommandTokens {
            stop: self.stop_token.clone(),
            start: self.start_token.clone(),
            speed_prefix: self.speed_prefix,
        }
    }

    pub fn write_to_file(&self, file_path: &str) -> Result<(), SettingsError> {
        let data = serde_yaml::to_string(self)?;
        fs::write(file_path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.speed_window()?;
        CommandInterpreter::new(self.command_tokens())?;
        positive("servo_frame_width", self.servo_frame_width)?;
        positive("servo_min_pulse_width", self.servo_min_pulse_width)?;
        ordered(
            "servo pulse width",
            self.servo_min_pulse_width,
            self.servo_max_pulse_width,
        )?;
        ordered(
            "servo duty cycle",
            self.servo_min_duty_cycle,
            self.servo_max_duty_cycle,
        )?;
        if self.servo_max_pulse_width > self.servo_frame_width {
            return Err(SettingsError::InvalidRange {
                name: "servo pulse width within frame",
                min: self.servo_max_pulse_width,
                max: self.servo_frame_width,
            });
        }
        if self.gpio_library == GpioLibrary::Rppal && self.pwm_channel > 1 {
            return Err(SettingsError::InvalidPwmChannel(self.pwm_channel));
        }

        let range = self.output_settings().range();
        if !range.contains(self.servo_initial_value) {
            return Err(SettingsError::InitialValueOutOfRange {
                value: self.servo_initial_value,
                min: range.min,
                max: range.max,
            });
        }
        Ok(())
    }

    pub fn speed_window(&self) -> Result<SpeedWindow, SettingsError> {
        SpeedWindow::new(self.minimum_speed, self.maximum_speed)
    }

    pub fn output_settings(&self) -> OutputSettings {
        OutputSettings {
            dev_mode: self.dev_mode,
            gpio_library: self.gpio_library,
            initial_value: self.servo_initial_value,
            min_pulse_width: self.servo_min_pulse_width,
            max_pulse_width: self.servo_max_pulse_width,
            frame_width: self.servo_frame_width,
            gpio_pin: self.servo_gpio_pin,
            pigpio_host: self.pigpio_host.clone(),
            pigpio_port: self.pigpio_port,
            pwm_channel: self.pwm_channel,
            min_duty_cycle: self.servo_min_duty_cycle,
            max_duty_cycle: self.servo_max_duty_cycle,
        }
    }
}

fn ordered(name: &'static str, min: f64, max: f64) -> Result<(), SettingsError> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(SettingsError::InvalidRange { name, min, max })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_window() {
        let settings = Settings {
            minimum_speed: 500.0,
            maximum_speed: 500.0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DegenerateWindow { .. })
        ));
    }

    #[test]
    fn rejects_initial_value_outside_duty_range() {
        let settings = Settings {
            gpio_library: GpioLibrary::Rppal,
            servo_initial_value: -1.0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InitialValueOutOfRange { .. })
        ));

        let settings = Settings {
            gpio_library: GpioLibrary::Rppal,
            servo_initial_value: 0.05,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_pulse_widths() {
        let settings = Settings {
            servo_min_pulse_width: 0.002,
            servo_max_pulse_width: 0.001,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidRange { .. })
        ));
    }

    #[test]
    fn dev_mode_keeps_range_of_configured_output() {
        let settings = Settings {
            dev_mode: true,
            gpio_library: GpioLibrary::Rppal,
            servo_initial_value: 0.05,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
        let output = settings.output_settings();
        assert!(output.dev_mode);
        assert_eq!(output.range(), OutputRange::new(0.05, 0.10));

        let servo_value = Settings {
            servo_initial_value: -1.0,
            ..settings
        };
        assert!(matches!(
            servo_value.validate(),
            Err(SettingsError::InitialValueOutOfRange { .. })
        ));
    }

    #[test]
    fn defaults_point_at_remote_pigpio_daemon() {
        let settings = Settings::default();
        assert_eq!(settings.pigpio_host, "octopi-zero2");
        assert_eq!(settings.pigpio_port, 32000);
    }

    #[test]
    fn tokens_default_when_missing_from_file() {
        let mut yaml = serde_yaml::to_string(&Settings::default()).unwrap();
        yaml = yaml
            .lines()
            .filter(|line| !line.contains("_token") && !line.contains("speed_prefix"))
            .collect::<Vec<_>>()
            .join("\n");
        let settings: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(settings.command_tokens(), CommandTokens::default());
    }

    #[test]
    fn rejects_empty_tokens() {
        let settings = Settings {
            stop_token: String::from("  "),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::EmptyToken("stop token"))
        ));
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let path = path.to_str().unwrap();

        let settings = Settings::from_file(path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(Path::new(path).exists());

        let reloaded = Settings::from_file(path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dev_mode: false\nminimum_speed: 0.0").unwrap();

        let res = Settings::from_file(file.path().to_str().unwrap());
        assert!(matches!(res, Err(SettingsError::Parse(_))));
    }
}
