//! Per-frame targeting decisions.

use log::warn;
use serde::{Deserialize, Serialize};

use beamsteer_core::{CoordinateMapper, TargetSample};

use crate::actuator::ActuatorLink;
use crate::state::Actuator;

/// How the elevation axis is driven while targeting.
///
/// Pan comes from the calibration mesh; elevation is a deployment policy
/// layered on top of the mapper, because most rigs either hold it steady or
/// derive it from the target height with a fixed linear law (the stock
/// mouse-drive rig used `y = 60 - 0.6 * vy`, i.e. `Affine { scale: -0.6,
/// offset: 60.0 }`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum YPolicy {
    /// Keep the current commanded elevation.
    Hold,
    /// `y = offset + scale * vy`.
    Affine { scale: f64, offset: f64 },
}

impl YPolicy {
    fn derive(&self, vy: f64, current_y: f64) -> f64 {
        match *self {
            YPolicy::Hold => current_y,
            YPolicy::Affine { scale, offset } => offset + scale * vy,
        }
    }
}

/// What one control tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// No detection this frame; the previous command stands.
    NoTarget,
    /// The mapper has no calibration data; no command was sent.
    NotCalibrated,
    /// A position command was issued (values after clamping).
    Commanded { x: f64, y: f64 },
}

/// Turns one frame's detection into one bounded actuator command.
///
/// The controller owns the mapper it queries; after a recalibration, swap
/// in a fresh mapper with [`TargetingController::set_mapper`].
#[derive(Debug)]
pub struct TargetingController {
    mapper: CoordinateMapper,
    y_policy: YPolicy,
    /// Mirror the mapped pan about the center of its limits, for rigs with
    /// a mirror-mounted pan servo.
    invert_x: bool,
}

impl TargetingController {
    pub fn new(mapper: CoordinateMapper, y_policy: YPolicy, invert_x: bool) -> Self {
        Self {
            mapper,
            y_policy,
            invert_x,
        }
    }

    /// Replace the mapper after the calibration mesh changed.
    pub fn set_mapper(&mut self, mapper: CoordinateMapper) {
        self.mapper = mapper;
    }

    #[inline]
    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Process one tick.
    ///
    /// An absent sample issues no command and leaves the actuator state
    /// untouched. An unavailable mapper skips the tick with a diagnostic
    /// instead of sending anything malformed. Otherwise the mapped pan and
    /// policy-derived elevation are clamped (inside the actuator's update
    /// funnel, unconditionally, as the last step) and transmitted.
    pub fn tick<L: ActuatorLink>(
        &self,
        sample: Option<TargetSample>,
        turret: &mut Actuator<L>,
    ) -> TickOutcome {
        let Some(sample) = sample else {
            return TickOutcome::NoTarget;
        };
        if !sample.vx.is_finite() || !sample.vy.is_finite() {
            warn!(
                "ignoring non-finite target sample ({}, {})",
                sample.vx, sample.vy
            );
            return TickOutcome::NoTarget;
        }

        let Some(mut x) = self.mapper.forward_x(sample.vx) else {
            warn!("no calibration data, skipping target at ({}, {})", sample.vx, sample.vy);
            return TickOutcome::NotCalibrated;
        };
        if self.invert_x {
            x = turret.state().x_limits.mirror(x);
        }
        let y = self.y_policy.derive(sample.vy, turret.state().y());

        let pos = turret.update_position(x, y, "auto targeting");
        TickOutcome::Commanded { x: pos.sx, y: pos.sy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SpoofLink;
    use crate::command::Command;
    use crate::state::ActuatorState;

    use beamsteer_core::{CalibrationMesh, ServoPos, VideoPoint};

    fn linear_mapper() -> CoordinateMapper {
        let mut mesh = CalibrationMesh::new();
        mesh.insert(VideoPoint::new(0.0, 50.0), ServoPos::new(135.0, 0.0))
            .unwrap();
        mesh.insert(VideoPoint::new(100.0, 50.0), ServoPos::new(45.0, 0.0))
            .unwrap();
        CoordinateMapper::new(&mesh)
    }

    fn turret() -> Actuator<SpoofLink> {
        Actuator::new(ActuatorState::stock(), SpoofLink::new())
    }

    #[test]
    fn no_detection_sends_nothing() {
        let controller = TargetingController::new(linear_mapper(), YPolicy::Hold, false);
        let mut turret = turret();
        assert_eq!(controller.tick(None, &mut turret), TickOutcome::NoTarget);
        assert!(turret.into_link().sent().is_empty());
    }

    #[test]
    fn detection_maps_pan_and_holds_elevation() {
        let controller = TargetingController::new(linear_mapper(), YPolicy::Hold, false);
        let mut turret = turret();
        let outcome = controller.tick(Some(TargetSample::new(50.0, 80.0, 0.9)), &mut turret);
        assert_eq!(outcome, TickOutcome::Commanded { x: 90.0, y: 0.0 });
        assert_eq!(
            turret.into_link().sent(),
            &[Command::Position { x: 90.0, y: 0.0 }]
        );
    }

    #[test]
    fn affine_elevation_policy() {
        // the stock mouse-drive law: y = 60 - 0.6 * vy
        let policy = YPolicy::Affine {
            scale: -0.6,
            offset: 60.0,
        };
        let controller = TargetingController::new(linear_mapper(), policy, false);
        let mut turret = turret();
        let outcome = controller.tick(Some(TargetSample::new(0.0, 50.0, 1.0)), &mut turret);
        assert_eq!(outcome, TickOutcome::Commanded { x: 135.0, y: 30.0 });
    }

    #[test]
    fn inverted_pan_mirrors_about_the_limits() {
        let controller = TargetingController::new(linear_mapper(), YPolicy::Hold, true);
        let mut turret = turret();
        let outcome = controller.tick(Some(TargetSample::new(0.0, 50.0, 1.0)), &mut turret);
        // forward(0) = 135, mirrored in [0, 270] stays 135
        assert_eq!(outcome, TickOutcome::Commanded { x: 135.0, y: 0.0 });

        let outcome = controller.tick(Some(TargetSample::new(100.0, 50.0, 1.0)), &mut turret);
        // forward(100) = 45, mirrored to 225
        assert_eq!(outcome, TickOutcome::Commanded { x: 225.0, y: 0.0 });
    }

    #[test]
    fn non_finite_sample_sends_nothing() {
        let controller = TargetingController::new(linear_mapper(), YPolicy::Hold, false);
        let mut turret = turret();
        for (vx, vy) in [
            (f64::NAN, 50.0),
            (50.0, f64::NAN),
            (f64::INFINITY, 50.0),
        ] {
            let outcome = controller.tick(Some(TargetSample::new(vx, vy, 0.9)), &mut turret);
            assert_eq!(outcome, TickOutcome::NoTarget);
        }
        assert!(turret.into_link().sent().is_empty());
    }

    #[test]
    fn uncalibrated_mapper_skips_the_tick() {
        let empty = CoordinateMapper::new(&CalibrationMesh::new());
        let controller = TargetingController::new(empty, YPolicy::Hold, false);
        let mut turret = turret();
        let outcome = controller.tick(Some(TargetSample::new(50.0, 50.0, 0.8)), &mut turret);
        assert_eq!(outcome, TickOutcome::NotCalibrated);
        assert!(turret.into_link().sent().is_empty());
    }

    #[test]
    fn commanded_position_always_within_limits() {
        // mesh maps straight to out-of-range servo values
        let mut mesh = CalibrationMesh::new();
        mesh.insert(VideoPoint::new(0.0, 0.0), ServoPos::new(-50.0, -10.0))
            .unwrap();
        mesh.insert(VideoPoint::new(100.0, 100.0), ServoPos::new(400.0, 100.0))
            .unwrap();
        let policy = YPolicy::Affine {
            scale: 2.0,
            offset: -30.0,
        };
        let controller = TargetingController::new(CoordinateMapper::new(&mesh), policy, false);
        let mut turret = turret();

        for (vx, vy) in [(0.0, 0.0), (100.0, 100.0), (50.0, 10.0), (-30.0, 140.0)] {
            let outcome = controller.tick(Some(TargetSample::new(vx, vy, 1.0)), &mut turret);
            let TickOutcome::Commanded { x, y } = outcome else {
                panic!("expected a command for ({vx}, {vy})");
            };
            assert!((0.0..=270.0).contains(&x), "x out of range: {x}");
            assert!((0.0..=75.0).contains(&y), "y out of range: {y}");
        }
    }
}
