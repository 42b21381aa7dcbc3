//! Bridge end-to-end tests
//!
//! Drive the bridge with bus messages and client messages and check what
//! lands in the output directory and what gets announced.
//!
//! Run with: `cargo test -p setu-bridge --test bridge_integration`

mod common;

use approx::assert_relative_eq;
use chitra_map::raster;
use common::{Fixture, PNG_SIGNATURE, free_grid, pose};
use serde_json::json;
use setu_bridge::{ClientMessage, Config, Notification};

#[test]
fn test_map_message_writes_live_artifacts() {
    let fx = Fixture::new();
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(10, 10, 0.1))
        .unwrap();
    fx.settle();

    let png = fx.artifact("map_live.png").expect("live image written");
    assert_eq!(&png[..8], &PNG_SIGNATURE);

    let pgm = fx.artifact("map_live.pgm").expect("live raster written");
    let (header, pixels) = raster::decode(&pgm).unwrap();
    assert_eq!((header.width, header.height), (10, 10));
    // Robot at the initial pose (0, 0) sits on the corner cell; live robot is 0.
    assert!(pixels.iter().all(|&p| p == 255 || p == 0));

    let yaml = String::from_utf8(fx.artifact("map_live.yaml").unwrap()).unwrap();
    assert!(yaml.contains("image: map_live.png\n"));
    assert!(yaml.contains("origin: [-0.5, -0.5, 0.0]\n"));

    assert_eq!(fx.recorder.count("map_update"), 1);
    assert!(fx.artifact("mission_map.png").is_none());
    fx.stop();
}

#[test]
fn test_odometry_renders_mission_with_marker() {
    let fx = Fixture::new();
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(10, 10, 0.1))
        .unwrap();
    fx.settle();
    fx.bridge
        .handle_message("turtlebot3/odom", pose(0.5, 0.5))
        .unwrap();
    fx.settle();

    let pgm = fx.artifact("mission_map.pgm").expect("mission raster written");
    let (_, pixels) = raster::decode(&pgm).unwrap();
    // 7x7 marker fully inside the grid, no path yet.
    assert_eq!(pixels.iter().filter(|&&p| p == 255).count(), 49);
    assert_eq!(pixels.iter().filter(|&&p| p == 200).count(), 0);

    let state = fx.bridge.current_state();
    assert_relative_eq!(state.robot_position.x, 0.5);
    assert_relative_eq!(state.robot_position.y, 0.5);
    assert_eq!(state.map_size, Some([10, 10]));
    assert_eq!(
        fx.recorder.kinds(),
        vec!["map_update", "trajectory_update", "map_update"]
    );
    fx.stop();
}

#[test]
fn test_trajectory_topic_draws_path_and_moves_robot() {
    let fx = Fixture::new();
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(20, 20, 0.1))
        .unwrap();
    fx.bridge
        .handle_message(
            "turtlebot/trajectory/tb3_1",
            json!({
                "trajectory": [{"x": 0.1, "y": 1.0}, {"x": 1.9, "y": 1.0}],
                "current_position": {"x": 1.0, "y": 1.0}
            }),
        )
        .unwrap();
    fx.settle();

    let state = fx.bridge.current_state();
    assert_eq!(state.trajectory.len(), 2);
    assert_relative_eq!(state.robot_position.x, 1.0);

    let pgm = fx.artifact("mission_map.pgm").unwrap();
    let (_, pixels) = raster::decode(&pgm).unwrap();
    assert!(pixels.iter().any(|&p| p == 200), "path drawn");
    assert!(pixels.iter().any(|&p| p == 255), "robot drawn");

    let sent = fx.recorder.sent.lock();
    let update = sent
        .iter()
        .find_map(|n| match n {
            Notification::TrajectoryUpdate { data } => Some(data.clone()),
            _ => None,
        })
        .expect("trajectory_update sent");
    assert_eq!(update.trajectory.len(), 2);
    assert_relative_eq!(update.robot_position.x, 1.0);
    drop(sent);
    fx.stop();
}

#[test]
fn test_client_trajectory_announces_path_with_map() {
    let fx = Fixture::new();
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(10, 10, 0.1))
        .unwrap();
    fx.settle();

    fx.bridge.handle_client(ClientMessage::TrajectoryUpdate {
        trajectory: vec![
            chitra_map::core::Pose2D::new(0.1, 0.1),
            chitra_map::core::Pose2D::new(0.8, 0.8),
        ],
    });
    fx.settle();

    let sent = fx.recorder.sent.lock();
    let Some(Notification::MapUpdate { data }) = sent.last() else {
        panic!("expected trailing map_update");
    };
    assert_eq!(data.url, "/mission_map.png");
    assert_eq!(data.trajectory.as_ref().map(Vec::len), Some(2));
    drop(sent);
    fx.stop();
}

#[test]
fn test_malformed_messages_leave_state_untouched() {
    let fx = Fixture::new();
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(4, 4, 0.5))
        .unwrap();
    fx.settle();

    assert!(fx
        .bridge
        .handle_message("turtlebot3/odom", json!({"x": "left"}))
        .is_err());
    assert!(fx
        .bridge
        .handle_message("turtlebot/trajectory/tb3_0", json!({"trajectory": 5}))
        .is_err());
    fx.bridge
        .handle_message("some/other/topic", json!({"ignored": true}))
        .unwrap();

    let state = fx.bridge.current_state();
    assert_eq!(state.robot_position.x, 0.0);
    assert!(state.trajectory.is_empty());

    let metrics = fx.bridge.metrics().snapshot();
    assert_eq!(metrics.messages, 4);
    assert_eq!(metrics.decode_errors, 2);
    fx.stop();
}

#[test]
fn test_custom_names_and_prefix() {
    let mut config = Config::default();
    config.output.mission_name = "fleet".to_string();
    config.output.url_prefix = "/static/".to_string();
    config.output.write_raster = false;
    config.topics.odometry = "robot/pose".to_string();

    let fx = Fixture::with_config(config);
    fx.bridge
        .handle_message("turtlebot3/map", free_grid(6, 6, 0.2))
        .unwrap();
    fx.bridge.handle_message("robot/pose", pose(0.2, 0.2)).unwrap();
    fx.settle();

    assert!(fx.artifact("fleet.png").is_some());
    assert!(fx.artifact("fleet.yaml").is_some());
    assert!(fx.artifact("fleet.pgm").is_none());
    fx.bridge
        .handle_client_text(r#"{"type":"request_map_update"}"#)
        .unwrap();

    let sent = fx.recorder.sent.lock();
    let Some(Notification::MapUpdate { data }) = sent.last() else {
        panic!("expected map_update");
    };
    assert_eq!(data.url, "/static/fleet.png");
    drop(sent);
    fx.stop();
}

#[test]
fn test_shipped_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/setu-bridge.toml");
    let config = Config::from_file(path).unwrap();
    assert_eq!(config.input.bind_address, "0.0.0.0:5570");
    assert_eq!(config.output.mission_name, "mission_map");
}
