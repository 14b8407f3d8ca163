//! Durable persistence of a calibration mesh.
//!
//! The on-disk format is the flat JSON table the original hardware tooling
//! reads: keys are `"<vx>,<vy>"` decimal ASCII anchors, values are
//! `[servo_x, servo_y]` pairs. There is no version field.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::geom::{ServoPos, VideoPoint};
use crate::mesh::CalibrationMesh;

/// Mesh persistence errors.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("calibration file not found: {0}")]
    NotFound(PathBuf),
    #[error("calibration file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Load a mesh from disk.
///
/// A missing file is [`StoreError::NotFound`]; content that is not a JSON
/// object of `"vx,vy" -> [sx, sy]` entries with finite numbers is
/// [`StoreError::Corrupt`]. Neither ever panics — callers are expected to
/// degrade to the uncalibrated state.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<CalibrationMesh, StoreError> {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let value: Value =
        serde_json::from_str(&raw).map_err(|e| corrupt(format!("invalid JSON: {e}")))?;
    let table = value
        .as_object()
        .ok_or_else(|| corrupt("top-level value is not an object".into()))?;

    let mut mesh = CalibrationMesh::new();
    for (key, entry) in table {
        let anchor = parse_anchor(key).ok_or_else(|| corrupt(format!("bad anchor key {key:?}")))?;
        let servo = parse_servo(entry)
            .ok_or_else(|| corrupt(format!("bad servo value for {key:?}: {entry}")))?;
        mesh.insert(anchor, servo)
            .map_err(|e| corrupt(e.to_string()))?;
    }
    Ok(mesh)
}

/// Save a mesh to disk, replacing any previous file atomically.
///
/// The table is serialized next to the destination and moved into place with
/// a rename, so a crash mid-write never leaves a half-written file behind.
pub fn save_mesh(path: impl AsRef<Path>, mesh: &CalibrationMesh) -> Result<(), StoreError> {
    let path = path.as_ref();
    let mut table = serde_json::Map::new();
    for (anchor, servo) in mesh.iter() {
        table.insert(
            format!("{},{}", anchor.vx, anchor.vy),
            serde_json::json!([servo.sx, servo.sy]),
        );
    }
    let json = serde_json::to_string_pretty(&Value::Object(table)).map_err(std::io::Error::other)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn parse_anchor(key: &str) -> Option<VideoPoint> {
    let (vx, vy) = key.split_once(',')?;
    let vx: f64 = vx.trim().parse().ok()?;
    let vy: f64 = vy.trim().parse().ok()?;
    let anchor = VideoPoint::new(vx, vy);
    anchor.is_finite().then_some(anchor)
}

fn parse_servo(entry: &Value) -> Option<ServoPos> {
    let pair = entry.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let pos = ServoPos::new(pair[0].as_f64()?, pair[1].as_f64()?);
    pos.is_finite().then_some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> CalibrationMesh {
        let mut mesh = CalibrationMesh::new();
        mesh.insert(VideoPoint::new(0.0, 50.0), ServoPos::new(135.0, 0.0))
            .unwrap();
        mesh.insert(VideoPoint::new(33.5, 50.0), ServoPos::new(105.25, 10.0))
            .unwrap();
        mesh.insert(VideoPoint::new(100.0, 50.0), ServoPos::new(45.0, 0.0))
            .unwrap();
        mesh
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration_mesh.json");
        let mesh = sample_mesh();

        save_mesh(&path, &mesh).unwrap();
        let loaded = load_mesh(&path).unwrap();

        assert_eq!(loaded.len(), mesh.len());
        for (anchor, servo) in mesh.iter() {
            assert_eq!(loaded.get(anchor), Some(servo));
        }
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_mesh(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn load_rejects_malformed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.json");

        for bad in [
            "not json at all",
            "[1, 2, 3]",
            r#"{"0,50": [135.0]}"#,
            r#"{"0,50": "135,0"}"#,
            r#"{"zero,50": [135.0, 0.0]}"#,
            r#"{"0,50": [135.0, null]}"#,
        ] {
            fs::write(&path, bad).unwrap();
            let err = load_mesh(&path).unwrap_err();
            assert!(
                matches!(err, StoreError::Corrupt { .. }),
                "expected Corrupt for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.json");

        fs::write(&path, "stale garbage").unwrap();
        save_mesh(&path, &sample_mesh()).unwrap();

        let loaded = load_mesh(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        // no temp file left behind
        assert!(!path.with_extension("tmp").exists());
    }
}
