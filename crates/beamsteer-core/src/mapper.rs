//! Forward and inverse coordinate queries over a calibration mesh.
//!
//! Mapping is *separable*: each axis is interpolated independently from its
//! own `(anchor, value)` control points, and the two axes never interact.
//! A query answers `None` when the underlying mesh is empty — that is the
//! documented "not yet calibrated" state, not an error. Non-finite queries
//! (NaN/inf, e.g. from a malformed detector line) also answer `None`
//! instead of faulting.

use crate::geom::{ServoPos, VideoPoint};
use crate::mesh::CalibrationMesh;

/// One axis worth of sorted control points for piecewise-linear lookup.
#[derive(Clone, Debug)]
struct AxisTable {
    keys: Vec<f64>,
    vals: Vec<f64>,
}

impl AxisTable {
    /// Build a table from `(key, value)` pairs in insertion order.
    ///
    /// The sort is stable, so pairs with equal keys keep their insertion
    /// order. [`AxisTable::eval`] then resolves a query at a shared node by
    /// position in the sorted table: the later pair wins at interior and
    /// maximum nodes, while a shared *minimum* node answers the earlier
    /// pair (the lower boundary clamp reads the first control point).
    fn build(pairs: impl Iterator<Item = (f64, f64)>) -> Option<AxisTable> {
        let mut pairs: Vec<(f64, f64)> = pairs.collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (keys, vals) = pairs.into_iter().unzip();
        Some(AxisTable { keys, vals })
    }

    /// Piecewise-linear interpolation with boundary clamping.
    ///
    /// Queries at or below the smallest key return the first control value,
    /// at or above the largest key the last one; in between the bracketing
    /// pair is interpolated linearly. A single control point degenerates to
    /// a constant function. `q` must be finite: the public query methods
    /// filter non-finite values before reaching here.
    fn eval(&self, q: f64) -> f64 {
        let n = self.keys.len();
        if q <= self.keys[0] {
            return self.vals[0];
        }
        if q >= self.keys[n - 1] {
            return self.vals[n - 1];
        }
        // first index with key > q; in 1..n because of the edge checks above
        let hi = self.keys.partition_point(|&k| k <= q);
        let lo = hi - 1;
        let (x0, x1) = (self.keys[lo], self.keys[hi]);
        let t = (q - x0) / (x1 - x0);
        self.vals[lo] + t * (self.vals[hi] - self.vals[lo])
    }
}

/// Pure query functions derived from a [`CalibrationMesh`].
///
/// The mapper is a read-only cache over the mesh it was built from: after a
/// recalibration replaces the mesh, build a fresh mapper — there is no
/// incremental update.
#[derive(Clone, Debug)]
pub struct CoordinateMapper {
    forward_x: Option<AxisTable>,
    forward_y: Option<AxisTable>,
    inverse_x: Option<AxisTable>,
    inverse_y: Option<AxisTable>,
}

impl CoordinateMapper {
    /// Build forward and inverse interpolants from a mesh.
    pub fn new(mesh: &CalibrationMesh) -> Self {
        Self {
            forward_x: AxisTable::build(mesh.iter().map(|(a, s)| (a.vx, s.sx))),
            forward_y: AxisTable::build(mesh.iter().map(|(a, s)| (a.vy, s.sy))),
            inverse_x: AxisTable::build(mesh.iter().map(|(a, s)| (s.sx, a.vx))),
            inverse_y: AxisTable::build(mesh.iter().map(|(a, s)| (s.sy, a.vy))),
        }
    }

    /// Whether any calibration data is loaded at all.
    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.forward_x.is_some()
    }

    /// Video X (percent) to servo X (hardware units).
    ///
    /// Answers `None` for an empty mesh or a non-finite query.
    pub fn forward_x(&self, vx: f64) -> Option<f64> {
        if !vx.is_finite() {
            return None;
        }
        self.forward_x.as_ref().map(|t| t.eval(vx))
    }

    /// Video Y (percent) to servo Y (hardware units).
    pub fn forward_y(&self, vy: f64) -> Option<f64> {
        if !vy.is_finite() {
            return None;
        }
        self.forward_y.as_ref().map(|t| t.eval(vy))
    }

    /// Full forward query, both axes independently.
    pub fn forward(&self, point: VideoPoint) -> Option<ServoPos> {
        Some(ServoPos::new(
            self.forward_x(point.vx)?,
            self.forward_y(point.vy)?,
        ))
    }

    /// Servo X back to video X.
    ///
    /// Well defined only when the sampled servo values are monotonic in the
    /// video coordinate. For non-monotonic data the result follows the
    /// stable sort of the control points: at a shared interior or maximum
    /// node the later-inserted sample wins, at a shared minimum node the
    /// earlier one does (boundary clamp). It never panics.
    pub fn inverse_x(&self, sx: f64) -> Option<f64> {
        if !sx.is_finite() {
            return None;
        }
        self.inverse_x.as_ref().map(|t| t.eval(sx))
    }

    /// Servo Y back to video Y. Same monotonicity caveat as [`Self::inverse_x`].
    pub fn inverse_y(&self, sy: f64) -> Option<f64> {
        if !sy.is_finite() {
            return None;
        }
        self.inverse_y.as_ref().map(|t| t.eval(sy))
    }

    /// Full inverse query, both axes independently.
    pub fn inverse(&self, pos: ServoPos) -> Option<VideoPoint> {
        Some(VideoPoint::new(
            self.inverse_x(pos.sx)?,
            self.inverse_y(pos.sy)?,
        ))
    }
}
