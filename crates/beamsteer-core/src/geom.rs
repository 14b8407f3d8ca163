use serde::{Deserialize, Serialize};

/// A point in normalized video-frame coordinates.
///
/// Both components are percentages of the frame size: `0` is the left/top
/// edge, `100` the right/bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoPoint {
    pub vx: f64,
    pub vy: f64,
}

impl VideoPoint {
    #[inline]
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    /// Both components are finite (no NaN/inf).
    #[inline]
    pub fn is_finite(self) -> bool {
        self.vx.is_finite() && self.vy.is_finite()
    }
}

/// A commanded actuator position in hardware units (degrees for the stock
/// servo pair).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoPos {
    pub sx: f64,
    pub sy: f64,
}

impl ServoPos {
    #[inline]
    pub fn new(sx: f64, sy: f64) -> Self {
        Self { sx, sy }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.sx.is_finite() && self.sy.is_finite()
    }
}

/// One frame's detected target, as handed over by the external detector.
///
/// Coordinates are pre-normalized to `[0, 100]` on both axes; class and
/// confidence filtering has already happened upstream. The sample lives for
/// one control tick and is never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSample {
    pub vx: f64,
    pub vy: f64,
    pub confidence: f32,
}

impl TargetSample {
    #[inline]
    pub fn new(vx: f64, vy: f64, confidence: f32) -> Self {
        Self { vx, vy, confidence }
    }

    #[inline]
    pub fn video_point(self) -> VideoPoint {
        VideoPoint::new(self.vx, self.vy)
    }
}
