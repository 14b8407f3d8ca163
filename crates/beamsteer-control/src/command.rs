//! The wire protocol spoken to the actuator firmware.

use std::fmt;

/// One actuator command.
///
/// The firmware understands newline-terminated ASCII lines of two forms:
/// a position update `x=<num>&y=<num>` and `solenoid=toggle`. Integral
/// values print without a fractional part, matching what the manual control
/// paths have always sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Position { x: f64, y: f64 },
    SolenoidToggle,
}

impl Command {
    /// Encode as one wire line, including the terminating newline.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Position { x, y } => write!(f, "x={x}&y={y}"),
            Command::SolenoidToggle => write!(f, "solenoid=toggle"),
        }
    }
}
