//! Actuator link, calibration sessions, and the per-frame targeting loop.
//!
//! Everything that touches the physical turret goes through the
//! [`Actuator`] wrapper: targeting, manual control, and calibration all
//! funnel into its single clamp-then-send update path, so the commanded
//! position can never leave the configured limits.

mod actuator;
mod command;
mod config;
mod controller;
mod manual;
mod session;
mod state;

pub use actuator::{ActuatorError, ActuatorLink, SpoofLink, TcpLink};
pub use command::Command;
pub use config::{ConfigError, TurretConfig};
pub use controller::{TargetingController, TickOutcome, YPolicy};
pub use manual::ManualCommand;
pub use session::{
    GridSession, GridSpec, SessionError, SessionState, XAxisSession, PLACEHOLDER_ELEVATION,
};
pub use state::{Actuator, ActuatorState, AxisLimits};
