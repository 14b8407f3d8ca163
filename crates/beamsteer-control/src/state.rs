//! Commanded actuator position and the single update funnel.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use beamsteer_core::ServoPos;

use crate::actuator::ActuatorLink;
use crate::command::Command;

/// Closed range for one actuator axis, in hardware units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl AxisLimits {
    #[inline]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }

    /// Mirror a value about the center of the range.
    #[inline]
    pub fn mirror(&self, v: f64) -> f64 {
        self.min + self.max - v
    }
}

/// The controller's view of the turret: last commanded position, solenoid
/// state, and the limits every command is clamped into.
///
/// There is no feedback sensor; the physical mechanism is assumed to
/// converge to the last command sent.
#[derive(Clone, Copy, Debug)]
pub struct ActuatorState {
    x: f64,
    y: f64,
    solenoid: bool,
    pub x_limits: AxisLimits,
    pub y_limits: AxisLimits,
    pub step_size: f64,
}

impl ActuatorState {
    /// Start position is clamped into the limits up front.
    pub fn new(x: f64, y: f64, x_limits: AxisLimits, y_limits: AxisLimits, step_size: f64) -> Self {
        Self {
            x: x_limits.clamp(x),
            y: y_limits.clamp(y),
            solenoid: false,
            x_limits,
            y_limits,
            step_size,
        }
    }

    /// Stock turret geometry: pan 135 in `[0, 270]`, elevation 0 in
    /// `[0, 75]`, 10-unit manual steps.
    pub fn stock() -> Self {
        Self::new(135.0, 0.0, AxisLimits::new(0.0, 270.0), AxisLimits::new(0.0, 75.0), 10.0)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn pos(&self) -> ServoPos {
        ServoPos::new(self.x, self.y)
    }

    #[inline]
    pub fn solenoid(&self) -> bool {
        self.solenoid
    }
}

/// The turret: commanded state plus its transport.
///
/// Every mutation of the commanded position — targeting, manual stepping,
/// mouse drive — goes through [`Actuator::update_position`], which clamps
/// as the last step before transmission. Sends are best effort: a failed
/// send is logged and that command is dropped, never retried.
pub struct Actuator<L: ActuatorLink> {
    state: ActuatorState,
    link: L,
}

impl<L: ActuatorLink> Actuator<L> {
    pub fn new(state: ActuatorState, link: L) -> Self {
        Self { state, link }
    }

    #[inline]
    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    /// Clamp `(new_x, new_y)` into the configured limits, adopt the result
    /// as the commanded position, and transmit it. `action` names the
    /// initiating operation in the log.
    pub fn update_position(&mut self, new_x: f64, new_y: f64, action: &str) -> ServoPos {
        self.state.x = self.state.x_limits.clamp(new_x);
        self.state.y = self.state.y_limits.clamp(new_y);
        let cmd = Command::Position {
            x: self.state.x,
            y: self.state.y,
        };
        match self.link.send(&cmd) {
            Ok(()) => debug!("{action}: {cmd}"),
            Err(e) => warn!("{action}: dropped command {cmd}: {e}"),
        }
        self.state.pos()
    }

    /// Toggle the solenoid. Only ever called from an explicit operator
    /// action, never from targeting.
    pub fn toggle_solenoid(&mut self) {
        let cmd = Command::SolenoidToggle;
        match self.link.send(&cmd) {
            Ok(()) => {
                self.state.solenoid = !self.state.solenoid;
                debug!("solenoid toggled, now {}", self.state.solenoid);
            }
            Err(e) => warn!("dropped solenoid toggle: {e}"),
        }
    }

    /// Tear down into the transport, e.g. to inspect a [`crate::SpoofLink`].
    pub fn into_link(self) -> L {
        self.link
    }
}
