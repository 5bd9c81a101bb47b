//! Minimal client for the pigpio daemon socket interface.
//!
//! Every request is 16 bytes: command, p1, p2 and p3 as little endian u32.
//! The daemon answers with the same layout, the last word carries the
//! signed result (negative values are pigpio error codes).
use std::{
    fmt::Debug,
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};
use thiserror::Error;

pub const CMD_MODES: u32 = 0;
pub const CMD_PFS: u32 = 7;
pub const CMD_SERVO: u32 = 8;
pub const CMD_GPW: u32 = 84;

pub const MODE_OUTPUT: u32 = 1;

const FRAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PigpioError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("can not resolve {0}")]
    Resolve(String),
    #[error("command {cmd} failed with code {code}")]
    Command { cmd: u32, code: i32 },
    #[error("reply for command {received} while waiting for {sent}")]
    UnexpectedReply { sent: u32, received: u32 },
}

pub type Result<T> = std::result::Result<T, PigpioError>;

pub fn encode_request(cmd: u32, p1: u32, p2: u32, p3: u32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    for (i, word) in [cmd, p1, p2, p3].iter().enumerate() {
        frame[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    frame
}

/// Returns the echoed command and the signed result.
pub fn decode_reply(frame: &[u8; FRAME_LEN]) -> (u32, i32) {
    let cmd = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let res = i32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]]);
    (cmd, res)
}

#[derive(Debug)]
pub struct PigpioClient<S: Read + Write = TcpStream> {
    stream: S,
}

impl PigpioClient<TcpStream> {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| PigpioError::Resolve(format!("{}:{}", host, port)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    log::debug!("connected to pigpio daemon at {}", addr);
                    return Ok(Self::from_stream(stream));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => PigpioError::Io(e),
            None => PigpioError::Resolve(format!("{}:{}", host, port)),
        })
    }
}

impl<S: Read + Write> PigpioClient<S> {
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    pub fn command(&mut self, cmd: u32, p1: u32, p2: u32) -> Result<u32> {
        self.stream.write_all(&encode_request(cmd, p1, p2, 0))?;
        let mut reply = [0u8; FRAME_LEN];
        self.stream.read_exact(&mut reply)?;

        let (received, res) = decode_reply(&reply);
        if received != cmd {
            return Err(PigpioError::UnexpectedReply {
                sent: cmd,
                received,
            });
        }
        if res < 0 {
            return Err(PigpioError::Command { cmd, code: res });
        }
        Ok(res as u32)
    }

    pub fn set_mode_output(&mut self, gpio: u8) -> Result<()> {
        self.command(CMD_MODES, gpio as u32, MODE_OUTPUT).map(|_| ())
    }

    /// Returns the frequency the daemon actually selected.
    pub fn set_pwm_frequency(&mut self, gpio: u8, frequency: u32) -> Result<u32> {
        self.command(CMD_PFS, gpio as u32, frequency)
    }

    /// `0` switches the pulses off.
    pub fn set_servo_pulsewidth(&mut self, gpio: u8, pulse_us: u32) -> Result<()> {
        self.command(CMD_SERVO, gpio as u32, pulse_us).map(|_| ())
    }

    pub fn get_servo_pulsewidth(&mut self, gpio: u8) -> Result<u32> {
        self.command(CMD_GPW, gpio as u32, 0)
    }

    #[cfg(test)]
    pub(crate) fn stream(&self) -> &S {
        &self.stream
    }
}
