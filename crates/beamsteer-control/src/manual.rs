//! Operator-issued manual commands.
//!
//! One enumerated command type and one dispatch function, replacing the
//! key-to-closure tables of the legacy controller. All position changes go
//! through the shared clamp/update funnel on [`Actuator`].

use beamsteer_core::ServoPos;

use crate::actuator::ActuatorLink;
use crate::state::Actuator;

/// A single manual control action.
///
/// The step directions keep the stock turret's inverted pan sense: `Left`
/// *increases* x and `Right` decreases it, because the pan servo is mounted
/// mirror-wise. The six presets are the operator's quick-aim poses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualCommand {
    StepUp,
    StepDown,
    StepLeft,
    StepRight,
    UpLeft,
    UpCenter,
    UpRight,
    DownLeft,
    DownCenter,
    DownRight,
    ToggleSolenoid,
}

impl ManualCommand {
    /// Map an input token (key name or letter) to a command.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "up" => Some(Self::StepUp),
            "down" => Some(Self::StepDown),
            "left" => Some(Self::StepLeft),
            "right" => Some(Self::StepRight),
            "q" => Some(Self::UpLeft),
            "w" => Some(Self::UpCenter),
            "e" => Some(Self::UpRight),
            "a" => Some(Self::DownLeft),
            "s" => Some(Self::DownCenter),
            "d" => Some(Self::DownRight),
            " " | "space" => Some(Self::ToggleSolenoid),
            _ => None,
        }
    }

    /// Human-readable action name used in logs.
    pub fn action_name(self) -> &'static str {
        match self {
            Self::StepUp => "UP",
            Self::StepDown => "DOWN",
            Self::StepLeft => "LEFT",
            Self::StepRight => "RIGHT",
            Self::UpLeft => "UP-LEFT",
            Self::UpCenter => "UP-CENTER",
            Self::UpRight => "UP-RIGHT",
            Self::DownLeft => "DOWN-LEFT",
            Self::DownCenter => "DOWN-CENTER",
            Self::DownRight => "DOWN-RIGHT",
            Self::ToggleSolenoid => "TOGGLE SOLENOID",
        }
    }

    /// Execute this command against the turret.
    pub fn apply<L: ActuatorLink>(self, turret: &mut Actuator<L>) -> ServoPos {
        let state = *turret.state();
        let (x, y, step) = (state.x(), state.y(), state.step_size);
        match self {
            Self::StepUp => turret.update_position(x, y + step, self.action_name()),
            Self::StepDown => turret.update_position(x, y - step, self.action_name()),
            Self::StepLeft => turret.update_position(x + step, y, self.action_name()),
            Self::StepRight => turret.update_position(x - step, y, self.action_name()),
            Self::UpLeft => turret.update_position(225.0, 45.0, self.action_name()),
            Self::UpCenter => turret.update_position(135.0, 45.0, self.action_name()),
            Self::UpRight => turret.update_position(45.0, 45.0, self.action_name()),
            Self::DownLeft => turret.update_position(225.0, 0.0, self.action_name()),
            Self::DownCenter => turret.update_position(135.0, 0.0, self.action_name()),
            Self::DownRight => turret.update_position(45.0, 0.0, self.action_name()),
            Self::ToggleSolenoid => {
                turret.toggle_solenoid();
                state.pos()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SpoofLink;
    use crate::state::ActuatorState;

    #[test]
    fn steps_keep_the_inverted_pan_sense() {
        let mut turret = Actuator::new(ActuatorState::stock(), SpoofLink::new());
        let pos = ManualCommand::StepLeft.apply(&mut turret);
        assert_eq!(pos.sx, 145.0);
        let pos = ManualCommand::StepRight.apply(&mut turret);
        assert_eq!(pos.sx, 135.0);
        let pos = ManualCommand::StepUp.apply(&mut turret);
        assert_eq!(pos.sy, 10.0);
    }

    #[test]
    fn steps_never_escape_the_limits() {
        let mut turret = Actuator::new(ActuatorState::stock(), SpoofLink::new());
        for _ in 0..40 {
            ManualCommand::StepLeft.apply(&mut turret);
            ManualCommand::StepDown.apply(&mut turret);
        }
        let state = turret.state();
        assert_eq!((state.x(), state.y()), (270.0, 0.0));
    }

    #[test]
    fn presets_jump_to_their_pose() {
        let mut turret = Actuator::new(ActuatorState::stock(), SpoofLink::new());
        let pos = ManualCommand::UpLeft.apply(&mut turret);
        assert_eq!((pos.sx, pos.sy), (225.0, 45.0));
        let pos = ManualCommand::DownRight.apply(&mut turret);
        assert_eq!((pos.sx, pos.sy), (45.0, 0.0));
    }

    #[test]
    fn key_mapping_covers_the_legacy_bindings() {
        assert_eq!(ManualCommand::from_key("q"), Some(ManualCommand::UpLeft));
        assert_eq!(ManualCommand::from_key("space"), Some(ManualCommand::ToggleSolenoid));
        assert_eq!(ManualCommand::from_key("up"), Some(ManualCommand::StepUp));
        assert_eq!(ManualCommand::from_key("z"), None);
    }
}
