//! Interactive calibration sessions.
//!
//! Both sessions are resumable state machines driven by external events
//! (marker shown, operator confirms alignment, abort), so the surrounding
//! frame loop is never blocked while the operator lines up the beam. The
//! legacy implementation parked the whole UI in a modal wait and had no way
//! to cancel; abort is a deliberate addition here. No confirmation timeout
//! is imposed — the machine just stays where it is, and timing out is the
//! caller's policy if it wants one.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use beamsteer_core::{save_mesh, CalibrationMesh, MeshError, ServoPos, StoreError, VideoPoint};

/// Servo elevation recorded for every sample of the single-axis session,
/// standing in for the unsampled Y axis.
pub const PLACEHOLDER_ELEVATION: f64 = 30.0;

/// Geometry of the full two-axis calibration grid.
///
/// Markers are spaced evenly over the frame, inset by `margin` on every
/// edge. Frame units are whatever the caller renders in (pixels or
/// percent); the recorded anchors are in the same units.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for GridSpec {
    /// The stock 3×10 grid over a percent-coordinate frame, no inset.
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 10,
            width: 100.0,
            height: 100.0,
            margin: 0.0,
        }
    }
}

impl GridSpec {
    /// Total number of grid points.
    #[inline]
    pub fn count(&self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    /// Marker position for the `index`-th point, row-major.
    pub fn point(&self, index: usize) -> VideoPoint {
        let row = (index / self.cols as usize) as f64;
        let col = (index % self.cols as usize) as f64;
        let x_span = self.width - 2.0 * self.margin;
        let y_span = self.height - 2.0 * self.margin;
        let x = if self.cols > 1 {
            self.margin + col * x_span / (self.cols - 1) as f64
        } else {
            self.width / 2.0
        };
        let y = if self.rows > 1 {
            self.margin + row * y_span / (self.rows - 1) as f64
        } else {
            self.height / 2.0
        };
        VideoPoint::new(x, y)
    }
}

/// Where a session currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Not started.
    Idle,
    /// A marker is displayed and the operator has yet to confirm alignment.
    /// `index` counts samples recorded so far.
    AwaitConfirmation { index: usize },
    /// All samples recorded; the mesh is ready to save.
    Complete,
    /// The mesh has been persisted.
    Saved,
    /// Cancelled by the operator; the partial mesh is discarded.
    Aborted,
}

/// Session protocol errors.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("session is not awaiting a confirmation")]
    NotAwaitingConfirmation,
    #[error("session is not complete, nothing to save")]
    NotComplete,
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The full two-axis grid-sampling session.
///
/// Protocol: `begin` yields the first marker to render; after the operator
/// steers the beam onto it, `confirm` records the current actuator position
/// under that anchor and yields the next marker, until the grid is
/// exhausted. The finished mesh *replaces* whatever mapper was in use —
/// callers rebuild their `CoordinateMapper` after [`GridSession::save`].
#[derive(Debug)]
pub struct GridSession {
    spec: GridSpec,
    mesh: CalibrationMesh,
    state: SessionState,
}

impl GridSession {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            mesh: CalibrationMesh::new(),
            state: SessionState::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Start the session and return the first marker to display, or `None`
    /// for a degenerate empty grid (the session completes immediately).
    pub fn begin(&mut self) -> Option<VideoPoint> {
        if self.spec.count() == 0 {
            self.state = SessionState::Complete;
            return None;
        }
        self.state = SessionState::AwaitConfirmation { index: 0 };
        Some(self.spec.point(0))
    }

    /// The marker currently awaiting confirmation, if any.
    pub fn current_marker(&self) -> Option<VideoPoint> {
        match self.state {
            SessionState::AwaitConfirmation { index } => Some(self.spec.point(index)),
            _ => None,
        }
    }

    /// The operator confirmed alignment: record the current actuator
    /// position for the displayed marker. Returns the next marker, or
    /// `None` once the grid is exhausted and the session is complete.
    pub fn confirm(&mut self, servo: ServoPos) -> Result<Option<VideoPoint>, SessionError> {
        let SessionState::AwaitConfirmation { index } = self.state else {
            return Err(SessionError::NotAwaitingConfirmation);
        };
        let anchor = self.spec.point(index);
        self.mesh.insert(anchor, servo)?;
        info!(
            "calibrated ({}, {}) -> ({}, {}) [{}/{}]",
            anchor.vx,
            anchor.vy,
            servo.sx,
            servo.sy,
            index + 1,
            self.spec.count()
        );

        let next = index + 1;
        if next == self.spec.count() {
            self.state = SessionState::Complete;
            info!("calibration complete, {} points", self.mesh.len());
            Ok(None)
        } else {
            self.state = SessionState::AwaitConfirmation { index: next };
            Ok(Some(self.spec.point(next)))
        }
    }

    /// Cancel the session and discard the partial mesh.
    pub fn abort(&mut self) {
        warn!("calibration aborted with {} points recorded", self.mesh.len());
        self.mesh = CalibrationMesh::new();
        self.state = SessionState::Aborted;
    }

    /// The recorded mesh so far.
    #[inline]
    pub fn mesh(&self) -> &CalibrationMesh {
        &self.mesh
    }

    /// Persist the completed mesh. On failure the in-memory mesh is kept
    /// and the session stays `Complete`, so the operator can retry.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        if self.state != SessionState::Complete {
            return Err(SessionError::NotComplete);
        }
        match save_mesh(path.as_ref(), &self.mesh) {
            Ok(()) => {
                self.state = SessionState::Saved;
                info!("calibration saved to {}", path.as_ref().display());
                Ok(())
            }
            Err(e) => {
                warn!("calibration save failed, mesh kept in memory: {e}");
                Err(e.into())
            }
        }
    }

    /// Hand over the mesh, e.g. to rebuild a mapper without reloading.
    pub fn into_mesh(self) -> CalibrationMesh {
        self.mesh
    }
}

/// The single-axis click-driven session.
///
/// Each operator click defines a target video X; the operator then steers
/// the beam onto it and confirms, recording the current servo X with
/// [`PLACEHOLDER_ELEVATION`] standing in on the Y side. The session
/// finishes after a fixed number of samples (10 in the stock setup).
#[derive(Debug)]
pub struct XAxisSession {
    target_count: usize,
    pending: Option<f64>,
    mesh: CalibrationMesh,
    state: SessionState,
}

impl XAxisSession {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            pending: None,
            mesh: CalibrationMesh::new(),
            state: SessionState::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The operator clicked a video X to sample. Re-clicking before the
    /// confirmation simply re-aims the pending sample.
    pub fn click(&mut self, video_x: f64) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::AwaitConfirmation { index: 0 };
            }
            SessionState::AwaitConfirmation { .. } => {}
            _ => return Err(SessionError::NotAwaitingConfirmation),
        }
        self.pending = Some(video_x);
        Ok(())
    }

    /// Record the current servo X for the pending click target.
    pub fn confirm(&mut self, servo_x: f64) -> Result<(), SessionError> {
        let (SessionState::AwaitConfirmation { index }, Some(video_x)) = (self.state, self.pending)
        else {
            return Err(SessionError::NotAwaitingConfirmation);
        };
        self.mesh.insert(
            VideoPoint::new(video_x, PLACEHOLDER_ELEVATION),
            ServoPos::new(servo_x, PLACEHOLDER_ELEVATION),
        )?;
        self.pending = None;
        info!(
            "calibrated video x {video_x} -> servo x {servo_x} [{}/{}]",
            index + 1,
            self.target_count
        );
        if index + 1 >= self.target_count {
            self.state = SessionState::Complete;
        } else {
            self.state = SessionState::AwaitConfirmation { index: index + 1 };
        }
        Ok(())
    }

    /// Cancel and discard, as for the grid session.
    pub fn abort(&mut self) {
        self.mesh = CalibrationMesh::new();
        self.pending = None;
        self.state = SessionState::Aborted;
    }

    #[inline]
    pub fn mesh(&self) -> &CalibrationMesh {
        &self.mesh
    }

    /// Persist the completed mesh; failure keeps the mesh, same contract as
    /// [`GridSession::save`].
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        if self.state != SessionState::Complete {
            return Err(SessionError::NotComplete);
        }
        match save_mesh(path.as_ref(), &self.mesh) {
            Ok(()) => {
                self.state = SessionState::Saved;
                Ok(())
            }
            Err(e) => {
                warn!("calibration save failed, mesh kept in memory: {e}");
                Err(e.into())
            }
        }
    }

    pub fn into_mesh(self) -> CalibrationMesh {
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid markers at index i, reproduced independently of `GridSpec::point`.
    fn expected_grid(spec: &GridSpec) -> Vec<VideoPoint> {
        let mut points = Vec::new();
        for row in 0..spec.rows {
            for col in 0..spec.cols {
                points.push(VideoPoint::new(
                    spec.margin
                        + col as f64 * (spec.width - 2.0 * spec.margin) / (spec.cols - 1) as f64,
                    spec.margin
                        + row as f64 * (spec.height - 2.0 * spec.margin) / (spec.rows - 1) as f64,
                ));
            }
        }
        points
    }

    #[test]
    fn full_grid_session_records_every_point_once() {
        let spec = GridSpec {
            rows: 3,
            cols: 10,
            width: 300.0,
            height: 150.0,
            margin: 10.0,
        };
        let mut session = GridSession::new(spec);

        let mut marker = session.begin();
        let mut sample = 0.0;
        while let Some(point) = marker {
            assert_eq!(session.current_marker(), Some(point));
            marker = session.confirm(ServoPos::new(sample, sample / 2.0)).unwrap();
            sample += 1.0;
        }

        assert_eq!(session.state(), SessionState::Complete);
        let mesh = session.mesh();
        assert_eq!(mesh.len(), 30);
        for point in expected_grid(&spec) {
            assert!(
                mesh.get(point).is_some(),
                "missing grid anchor ({}, {})",
                point.vx,
                point.vy
            );
        }
    }

    #[test]
    fn confirm_outside_protocol_is_an_error() {
        let mut session = GridSession::new(GridSpec::default());
        let err = session.confirm(ServoPos::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, SessionError::NotAwaitingConfirmation));
    }

    #[test]
    fn abort_discards_partial_mesh() {
        let mut session = GridSession::new(GridSpec::default());
        session.begin().unwrap();
        session.confirm(ServoPos::new(100.0, 10.0)).unwrap();
        session.abort();
        assert_eq!(session.state(), SessionState::Aborted);
        assert!(session.mesh().is_empty());
    }

    #[test]
    fn failed_save_keeps_mesh_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = GridSession::new(GridSpec {
            rows: 1,
            cols: 2,
            ..GridSpec::default()
        });
        session.begin().unwrap();
        session.confirm(ServoPos::new(135.0, 0.0)).unwrap();
        let done = session.confirm(ServoPos::new(45.0, 0.0)).unwrap();
        assert!(done.is_none());

        let bogus = dir.path().join("no-such-dir").join("mesh.json");
        assert!(session.save(&bogus).is_err());
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.mesh().len(), 2);

        session.save(dir.path().join("mesh.json")).unwrap();
        assert_eq!(session.state(), SessionState::Saved);
    }

    #[test]
    fn x_axis_session_uses_placeholder_elevation() {
        let mut session = XAxisSession::new(3);
        for (click, servo) in [(10.0, 200.0), (50.0, 135.0), (90.0, 70.0)] {
            session.click(click).unwrap();
            session.confirm(servo).unwrap();
        }
        assert_eq!(session.state(), SessionState::Complete);

        let mesh = session.into_mesh();
        assert_eq!(mesh.len(), 3);
        assert_eq!(
            mesh.get(VideoPoint::new(50.0, PLACEHOLDER_ELEVATION)),
            Some(ServoPos::new(135.0, PLACEHOLDER_ELEVATION))
        );
    }

    #[test]
    fn x_axis_reclick_reaims_pending_sample() {
        let mut session = XAxisSession::new(1);
        session.click(10.0).unwrap();
        session.click(20.0).unwrap();
        session.confirm(100.0).unwrap();

        let mesh = session.into_mesh();
        assert_eq!(mesh.len(), 1);
        assert!(mesh.get(VideoPoint::new(20.0, PLACEHOLDER_ELEVATION)).is_some());
        assert!(mesh.get(VideoPoint::new(10.0, PLACEHOLDER_ELEVATION)).is_none());
    }

    #[test]
    fn x_axis_confirm_without_click_is_an_error() {
        let mut session = XAxisSession::new(2);
        assert!(matches!(
            session.confirm(100.0),
            Err(SessionError::NotAwaitingConfirmation)
        ));
    }
}
