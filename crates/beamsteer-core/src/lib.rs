//! Calibration data model and coordinate mapping for the beamsteer turret.
//!
//! This crate is intentionally small and purely computational. It does *not*
//! depend on any concrete video source, detector, or actuator transport: it
//! only knows about normalized video coordinates, sampled servo positions,
//! and the interpolation between them.

mod geom;
mod logger;
mod mapper;
mod mesh;
mod store;

pub use geom::{ServoPos, TargetSample, VideoPoint};
pub use mapper::CoordinateMapper;
pub use mesh::{CalibrationMesh, MeshError};
pub use store::{load_mesh, save_mesh, StoreError};

pub use logger::init_with_level;
