//! The sampled video-to-servo correspondence table.

use crate::geom::{ServoPos, VideoPoint};

/// Mesh construction/insertion errors.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("calibration values must be finite, got anchor ({vx}, {vy}) -> ({sx}, {sy})")]
    NonFinite { vx: f64, vy: f64, sx: f64, sy: f64 },
}

/// A table of sampled correspondences between video anchor points and
/// actuator positions.
///
/// Anchors are unique within a mesh; inserting an existing anchor replaces
/// its servo position in place. Entries keep their insertion order, which is
/// what makes the mapper's stable sort tie-break well defined.
///
/// A mesh may be empty — that is the documented "not yet calibrated" state,
/// and every [`crate::CoordinateMapper`] query over it answers `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationMesh {
    entries: Vec<(VideoPoint, ServoPos)>,
}

impl CalibrationMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one correspondence. Replaces the servo position if the anchor
    /// was already sampled, keeping the anchor's original position in the
    /// insertion order.
    pub fn insert(&mut self, anchor: VideoPoint, servo: ServoPos) -> Result<(), MeshError> {
        if !anchor.is_finite() || !servo.is_finite() {
            return Err(MeshError::NonFinite {
                vx: anchor.vx,
                vy: anchor.vy,
                sx: servo.sx,
                sy: servo.sy,
            });
        }
        if let Some(slot) = self.entries.iter_mut().find(|(a, _)| *a == anchor) {
            slot.1 = servo;
        } else {
            self.entries.push((anchor, servo));
        }
        Ok(())
    }

    /// Look up the servo position recorded for an exact anchor.
    pub fn get(&self, anchor: VideoPoint) -> Option<ServoPos> {
        self.entries
            .iter()
            .find(|(a, _)| *a == anchor)
            .map(|(_, s)| *s)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (VideoPoint, ServoPos)> + '_ {
        self.entries.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(VideoPoint, ServoPos)> for CalibrationMesh {
    /// Collect correspondences, skipping non-finite ones.
    fn from_iter<T: IntoIterator<Item = (VideoPoint, ServoPos)>>(iter: T) -> Self {
        let mut mesh = CalibrationMesh::new();
        for (anchor, servo) in iter {
            let _ = mesh.insert(anchor, servo);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_anchors_unique() {
        let mut mesh = CalibrationMesh::new();
        mesh.insert(VideoPoint::new(10.0, 20.0), ServoPos::new(100.0, 5.0))
            .unwrap();
        mesh.insert(VideoPoint::new(30.0, 20.0), ServoPos::new(80.0, 5.0))
            .unwrap();
        mesh.insert(VideoPoint::new(10.0, 20.0), ServoPos::new(90.0, 6.0))
            .unwrap();

        assert_eq!(mesh.len(), 2);
        assert_eq!(
            mesh.get(VideoPoint::new(10.0, 20.0)),
            Some(ServoPos::new(90.0, 6.0))
        );
        // replacement does not move the anchor in insertion order
        let first = mesh.iter().next().unwrap();
        assert_eq!(first.0, VideoPoint::new(10.0, 20.0));
    }

    #[test]
    fn insert_rejects_non_finite() {
        let mut mesh = CalibrationMesh::new();
        let err = mesh.insert(VideoPoint::new(f64::NAN, 0.0), ServoPos::new(1.0, 2.0));
        assert!(matches!(err, Err(MeshError::NonFinite { .. })));
        assert!(mesh.is_empty());

        let err = mesh.insert(VideoPoint::new(0.0, 0.0), ServoPos::new(f64::INFINITY, 2.0));
        assert!(matches!(err, Err(MeshError::NonFinite { .. })));
    }
}
