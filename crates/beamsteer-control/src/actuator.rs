//! Transport to the physical actuator.
//!
//! The link is a long-lived stream established once at startup; each command
//! goes out as one atomic write, fire-and-forget. There is no reconnection
//! and no feedback channel — the turret is assumed to converge to the last
//! command it received.

use std::io::Write;
use std::net::TcpStream;

use log::info;

use crate::command::Command;

/// Actuator transport errors.
#[derive(thiserror::Error, Debug)]
pub enum ActuatorError {
    /// The link could not be established. Fatal to the targeting subsystem:
    /// the controller must not run without a connected actuator.
    #[error("failed to connect to actuator at {addr}: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// One command failed to transmit. Non-fatal: callers log it and drop
    /// the command rather than retry a stale position.
    #[error("failed to send actuator command: {0}")]
    SendFailed(#[source] std::io::Error),
}

/// The seam between the control logic and the hardware transport.
pub trait ActuatorLink {
    /// Transmit one command as a single write.
    fn send(&mut self, cmd: &Command) -> Result<(), ActuatorError>;
}

impl<L: ActuatorLink + ?Sized> ActuatorLink for Box<L> {
    fn send(&mut self, cmd: &Command) -> Result<(), ActuatorError> {
        (**self).send(cmd)
    }
}

/// TCP link to the turret firmware.
pub struct TcpLink {
    stream: TcpStream,
}

impl TcpLink {
    /// Establish the connection. Failure here is [`ActuatorError::ConnectionFailed`].
    pub fn connect(addr: &str) -> Result<Self, ActuatorError> {
        let stream = TcpStream::connect(addr).map_err(|e| ActuatorError::ConnectionFailed {
            addr: addr.to_string(),
            source: e,
        })?;
        info!("connected to actuator at {addr}");
        Ok(Self { stream })
    }
}

impl ActuatorLink for TcpLink {
    fn send(&mut self, cmd: &Command) -> Result<(), ActuatorError> {
        self.stream
            .write_all(cmd.encode().as_bytes())
            .map_err(ActuatorError::SendFailed)
    }
}

/// A link that only logs, for dry runs without hardware.
///
/// Sent commands are recorded in order, which also makes this the natural
/// test double for the control loop.
#[derive(Debug, Default)]
pub struct SpoofLink {
    sent: Vec<Command>,
}

impl SpoofLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands sent so far, in order.
    pub fn sent(&self) -> &[Command] {
        &self.sent
    }
}

impl ActuatorLink for SpoofLink {
    fn send(&mut self, cmd: &Command) -> Result<(), ActuatorError> {
        info!("spoof actuator: {cmd}");
        self.sent.push(*cmd);
        Ok(())
    }
}
