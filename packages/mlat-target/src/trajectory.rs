//! trajectory.rs — waypoint loading for the target's recorded path.
//!
//! The trajectory file is a JSON array of `{"x": f, "y": f, "z": f}`
//! objects. An unreadable file, a malformed waypoint (missing coordinate)
//! or an empty array are all fatal configuration errors at startup.

use serde::Deserialize;
use thiserror::Error;

use mlat_types::Vec3;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("failed to read trajectory file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid trajectory in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("trajectory file {path} contains no waypoints")]
    Empty { path: String },
}

#[derive(Debug, Deserialize)]
struct Waypoint {
    x: f64,
    y: f64,
    z: f64,
}

pub fn load_waypoints(path: &str) -> Result<Vec<Vec3>, TrajectoryError> {
    let data = std::fs::read_to_string(path).map_err(|source| TrajectoryError::Io {
        path: path.to_string(),
        source,
    })?;
    let waypoints = parse_waypoints(&data).map_err(|source| TrajectoryError::Parse {
        path: path.to_string(),
        source,
    })?;
    if waypoints.is_empty() {
        return Err(TrajectoryError::Empty {
            path: path.to_string(),
        });
    }
    Ok(waypoints)
}

fn parse_waypoints(data: &str) -> Result<Vec<Vec3>, serde_json::Error> {
    let entries: Vec<Waypoint> = serde_json::from_str(data)?;
    Ok(entries
        .into_iter()
        .map(|w| Vec3::new(w.x, w.y, w.z))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_waypoint_list() {
        let waypoints = parse_waypoints(
            r#"[{"x": 5.0, "y": 2.5, "z": 1.2}, {"x": 4.9, "y": 2.6, "z": 1.2}]"#,
        )
        .unwrap();
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0], Vec3::new(5.0, 2.5, 1.2));
        assert_eq!(waypoints[1], Vec3::new(4.9, 2.6, 1.2));
    }

    #[test]
    fn missing_coordinate_is_an_error() {
        assert!(parse_waypoints(r#"[{"x": 1.0, "y": 2.0}]"#).is_err());
    }

    #[test]
    fn non_object_entries_are_an_error() {
        assert!(parse_waypoints(r#"[[1.0, 2.0, 3.0]]"#).is_err());
        assert!(parse_waypoints(r#""not a list""#).is_err());
    }

    #[test]
    fn empty_trajectory_is_fatal() {
        let dir = std::env::temp_dir().join("mlat-target-test-empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.json");
        std::fs::write(&path, "[]").unwrap();

        let err = load_waypoints(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, TrajectoryError::Empty { .. }));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load_waypoints("definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TrajectoryError::Io { .. }));
    }
}
