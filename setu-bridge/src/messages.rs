//! Message types
//!
//! Three directions:
//! - **Bus → bridge**: [`BusMessage`], decoded from a topic and a JSON payload
//! - **Browser → bridge**: [`ClientMessage`]
//! - **Bridge → browser**: [`Notification`], serialized as
//!   `{"type": "...", "data": {...}}`
//!
//! Input sources deliver bus traffic wrapped in an [`Envelope`].

use chitra_map::OccupancyGrid;
use chitra_map::core::{MapOrigin, Pose2D};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TopicConfig;
use crate::error::{Error, Result};

/// One bus message as recorded or framed by an input source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Envelope {
    /// Topic the message was published on
    pub topic: String,
    /// JSON payload
    pub payload: Value,
    /// Capture time, used for replay pacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl Envelope {
    /// Envelope without a capture time.
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            timestamp_ms: None,
        }
    }
}

// ============================================================================
// Bus → bridge
// ============================================================================

/// Grid origin, in either of the two layouts robots publish.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OriginField {
    /// `{"position": {"x", "y", "z"}, "orientation": {...}}`
    Nested {
        /// Origin position
        position: MapOrigin,
    },
    /// `{"x", "y", "z"}`
    Flat(MapOrigin),
}

impl OriginField {
    /// Origin position regardless of layout.
    pub fn position(self) -> MapOrigin {
        match self {
            OriginField::Nested { position } => position,
            OriginField::Flat(origin) => origin,
        }
    }
}

/// Occupancy grid payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridMessage {
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Meters per cell
    pub resolution: f64,
    /// World position of cell (0, 0)
    pub origin: OriginField,
    /// Row-major cell values
    pub data: Vec<i16>,
}

impl GridMessage {
    /// Validate into an [`OccupancyGrid`].
    pub fn into_grid(self) -> chitra_map::Result<OccupancyGrid> {
        OccupancyGrid::new(
            self.width,
            self.height,
            self.resolution,
            self.origin.position(),
            self.data,
        )
    }
}

/// Quaternion orientation; carried, never used.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Orientation {
    /// x
    #[serde(default)]
    pub x: f64,
    /// y
    #[serde(default)]
    pub y: f64,
    /// z
    #[serde(default)]
    pub z: f64,
    /// w
    #[serde(default = "default_w")]
    pub w: f64,
}

fn default_w() -> f64 {
    1.0
}

/// Odometry payload.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoseMessage {
    /// X in meters
    pub x: f64,
    /// Y in meters
    pub y: f64,
    /// Z in meters
    #[serde(default)]
    pub z: f64,
    /// Heading
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

impl PoseMessage {
    /// Planar position.
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y)
    }
}

/// Trajectory payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathMessage {
    /// Points in traversal order
    pub trajectory: Vec<Pose2D>,
    /// Robot position, when the sender knows it
    #[serde(default)]
    pub current_position: Option<Pose2D>,
}

/// Decoded bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// New occupancy grid
    Map(GridMessage),
    /// New robot pose
    Odometry(PoseMessage),
    /// New path for a robot
    Trajectory {
        /// Topic suffix
        robot: String,
        /// Path and optional position
        path: PathMessage,
    },
    /// Mission status for a robot, passed through untouched
    MissionStatus {
        /// Topic suffix
        robot: String,
        /// Raw status payload
        status: Value,
    },
    /// Topic the bridge does not handle
    Ignored,
}

impl BusMessage {
    /// Route by topic and decode the payload.
    pub fn decode(topic: &str, payload: Value, topics: &TopicConfig) -> Result<Self> {
        if topic == topics.map {
            let grid = serde_json::from_value(payload).map_err(|e| Error::decode(topic, e))?;
            Ok(BusMessage::Map(grid))
        } else if topic == topics.odometry {
            let pose = serde_json::from_value(payload).map_err(|e| Error::decode(topic, e))?;
            Ok(BusMessage::Odometry(pose))
        } else if let Some(robot) = topic.strip_prefix(&topics.trajectory_prefix) {
            let path = serde_json::from_value(payload).map_err(|e| Error::decode(topic, e))?;
            Ok(BusMessage::Trajectory {
                robot: robot.to_string(),
                path,
            })
        } else if let Some(robot) = topic.strip_prefix(&topics.mission_status_prefix) {
            Ok(BusMessage::MissionStatus {
                robot: robot.to_string(),
                status: payload,
            })
        } else {
            Ok(BusMessage::Ignored)
        }
    }
}

// ============================================================================
// Browser → bridge
// ============================================================================

/// Push-channel message from a browser client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replace the path and re-render the mission map
    TrajectoryUpdate {
        /// New path
        trajectory: Vec<Pose2D>,
    },
    /// Announce the mission map again
    RequestMapUpdate,
}

impl ClientMessage {
    /// Parse a client text frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::decode("client", e))
    }
}

// ============================================================================
// Bridge → browser
// ============================================================================

/// A rendered image is ready.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapUpdate {
    /// Image URL
    pub url: String,
    /// RFC 3339
    pub timestamp: String,
    /// Path drawn on the image, for clients that overlay it themselves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Vec<Pose2D>>,
}

/// Path or pose changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryUpdate {
    /// Current path
    pub trajectory: Vec<Pose2D>,
    /// Current pose
    #[serde(rename = "robotPosition")]
    pub robot_position: Pose2D,
    /// RFC 3339
    pub timestamp: String,
}

/// Push notification to browser clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// `{"type":"map_update","data":{url,timestamp,trajectory?}}`
    MapUpdate {
        /// Payload
        data: MapUpdate,
    },
    /// `{"type":"trajectory_update","data":{trajectory,robotPosition,timestamp}}`
    TrajectoryUpdate {
        /// Payload
        data: TrajectoryUpdate,
    },
    /// `{"type":"mission_status","data":<status>,"timestamp":...}`
    MissionStatus {
        /// Status as received
        data: Value,
        /// RFC 3339
        timestamp: String,
    },
}

impl Notification {
    /// Map update stamped now.
    pub fn map_update(url: impl Into<String>, trajectory: Option<Vec<Pose2D>>) -> Self {
        Notification::MapUpdate {
            data: MapUpdate {
                url: url.into(),
                timestamp: timestamp_now(),
                trajectory,
            },
        }
    }

    /// Trajectory update stamped now.
    pub fn trajectory_update(trajectory: Vec<Pose2D>, robot_position: Pose2D) -> Self {
        Notification::TrajectoryUpdate {
            data: TrajectoryUpdate {
                trajectory,
                robot_position,
                timestamp: timestamp_now(),
            },
        }
    }

    /// Mission status pass-through stamped now.
    pub fn mission_status(status: Value) -> Self {
        Notification::MissionStatus {
            data: status,
            timestamp: timestamp_now(),
        }
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::MapUpdate { .. } => "map_update",
            Notification::TrajectoryUpdate { .. } => "trajectory_update",
            Notification::MissionStatus { .. } => "mission_status",
        }
    }

    /// JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Current UTC time, RFC 3339 with milliseconds.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topics() -> TopicConfig {
        TopicConfig::default()
    }

    #[test]
    fn test_flat_and_nested_origin() {
        let flat = json!({
            "width": 2, "height": 1, "resolution": 0.05,
            "origin": {"x": -1.0, "y": -2.0, "z": 0.0},
            "data": [0, 100]
        });
        let nested = json!({
            "width": 2, "height": 1, "resolution": 0.05,
            "origin": {
                "position": {"x": -1.0, "y": -2.0, "z": 0.0},
                "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}
            },
            "data": [0, 100]
        });
        for payload in [flat, nested] {
            let BusMessage::Map(grid) = BusMessage::decode("turtlebot3/map", payload, &topics()).unwrap()
            else {
                panic!("expected map");
            };
            let grid = grid.into_grid().unwrap();
            assert_eq!(grid.origin(), MapOrigin::new(-1.0, -2.0, 0.0));
        }
    }

    #[test]
    fn test_origin_without_z() {
        let payload = json!({
            "width": 1, "height": 1, "resolution": 1.0,
            "origin": {"x": 3.0, "y": 4.0},
            "data": [-1]
        });
        let msg = BusMessage::decode("turtlebot3/map", payload, &topics()).unwrap();
        let BusMessage::Map(grid) = msg else {
            panic!("expected map");
        };
        assert_eq!(grid.origin.position(), MapOrigin::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_grid_with_bad_length_decodes_but_fails_validation() {
        let payload = json!({
            "width": 2, "height": 2, "resolution": 1.0,
            "origin": {"x": 0.0, "y": 0.0, "z": 0.0},
            "data": [0, 0, 0]
        });
        let BusMessage::Map(grid) = BusMessage::decode("turtlebot3/map", payload, &topics()).unwrap()
        else {
            panic!("expected map");
        };
        assert!(matches!(
            grid.into_grid(),
            Err(chitra_map::Error::InvalidGridData(_))
        ));
    }

    #[test]
    fn test_odometry() {
        let payload = json!({"x": 1.5, "y": -0.5, "orientation": {"z": 0.7, "w": 0.7}});
        let msg = BusMessage::decode("turtlebot3/odom", payload, &topics()).unwrap();
        let BusMessage::Odometry(pose) = msg else {
            panic!("expected odometry");
        };
        assert_eq!(pose.pose(), Pose2D::new(1.5, -0.5));

        let missing = BusMessage::decode("turtlebot3/odom", json!({"x": 1.0}), &topics());
        assert!(matches!(missing, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_trajectory_and_status_routing() {
        let payload = json!({
            "trajectory": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.5, "z": 0.0}],
            "current_position": {"x": 1.0, "y": 0.5}
        });
        let msg = BusMessage::decode("turtlebot/trajectory/tb3_0", payload, &topics()).unwrap();
        let BusMessage::Trajectory { robot, path } = msg else {
            panic!("expected trajectory");
        };
        assert_eq!(robot, "tb3_0");
        assert_eq!(path.trajectory.len(), 2);
        assert_eq!(path.current_position, Some(Pose2D::new(1.0, 0.5)));

        let msg = BusMessage::decode(
            "turtlebot/mission_status/tb3_1",
            json!({"status": "done"}),
            &topics(),
        )
        .unwrap();
        assert_eq!(
            msg,
            BusMessage::MissionStatus {
                robot: "tb3_1".to_string(),
                status: json!({"status": "done"})
            }
        );

        let msg = BusMessage::decode("robot/move", json!("forward"), &topics()).unwrap();
        assert_eq!(msg, BusMessage::Ignored);
    }

    #[test]
    fn test_client_messages() {
        let msg = ClientMessage::parse(r#"{"type":"trajectory_update","trajectory":[{"x":1,"y":2}]}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::TrajectoryUpdate {
                trajectory: vec![Pose2D::new(1.0, 2.0)]
            }
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"request_map_update"}"#).unwrap(),
            ClientMessage::RequestMapUpdate
        );
        assert!(ClientMessage::parse(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_notification_shapes() {
        let n = Notification::map_update("/mission_map.png", None);
        let v: Value = serde_json::from_str(&n.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "map_update");
        assert_eq!(v["data"]["url"], "/mission_map.png");
        assert!(v["data"].get("trajectory").is_none());

        let n = Notification::trajectory_update(vec![Pose2D::new(1.0, 2.0)], Pose2D::new(3.0, 4.0));
        let v: Value = serde_json::from_str(&n.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "trajectory_update");
        assert_eq!(v["data"]["robotPosition"]["x"], 3.0);
        assert_eq!(v["data"]["trajectory"][0]["y"], 2.0);

        let n = Notification::mission_status(json!({"state": "active"}));
        let v: Value = serde_json::from_str(&n.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "mission_status");
        assert_eq!(v["data"]["state"], "active");
        assert!(v["timestamp"].is_string());
        assert_eq!(n.kind(), "mission_status");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_envelope() {
        let env: Envelope =
            serde_json::from_str(r#"{"topic":"turtlebot3/odom","payload":{"x":0,"y":0}}"#).unwrap();
        assert_eq!(env.timestamp_ms, None);
        assert_eq!(env.topic, "turtlebot3/odom");
    }
}
