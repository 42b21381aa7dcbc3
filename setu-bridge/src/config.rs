//! Configuration for SetuBridge
//!
//! Loaded from a TOML file. Every section and key is optional; anything
//! missing falls back to the defaults below.
//!
//! ```toml
//! [input]
//! source = "replay"          # replay | tcp
//! replay_file = "session.jsonl"
//! speed = 1.0                # 0 = as fast as possible
//!
//! [topics]
//! map = "turtlebot3/map"
//! odometry = "turtlebot3/odom"
//!
//! [output]
//! directory = "maps"
//!
//! [render]
//! convention = "grid_up"     # grid_up | image_down
//! marker_half_width = 3
//! palette = "ros"            # ros | normalized
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::Path;

use chitra_map::overlay::MAX_MARKER_HALF_WIDTH;
use chitra_map::{AxisConvention, InputPalette, OverlayConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Where bus messages come from
    #[serde(default)]
    pub input: InputConfig,
    /// Topic routing
    #[serde(default)]
    pub topics: TopicConfig,
    /// Artifact output
    #[serde(default)]
    pub output: OutputConfig,
    /// Overlay geometry and cell interpretation
    #[serde(default)]
    pub render: RenderConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the TOML types alone do not constrain.
    pub fn validate(&self) -> Result<()> {
        let half_width = self.render.marker_half_width;
        if !(0..=MAX_MARKER_HALF_WIDTH).contains(&half_width) {
            return Err(Error::InvalidConfig(format!(
                "render.marker_half_width must be in 0..={}, got {}",
                MAX_MARKER_HALF_WIDTH, half_width
            )));
        }
        let speed = self.input.speed;
        if !speed.is_finite() || speed < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "input.speed must be finite and not negative, got {}",
                speed
            )));
        }
        Ok(())
    }
}

/// Input source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// JSON-lines recording
    #[default]
    Replay,
    /// Length-prefixed JSON frames over TCP
    Tcp,
}

/// Input configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// Source kind
    pub source: SourceKind,
    /// Recording to replay (replay source)
    pub replay_file: Option<String>,
    /// Replay speed multiplier; 0 disables pacing
    pub speed: f64,
    /// Restart the recording at end of file
    pub loop_playback: bool,
    /// Listen address (tcp source)
    pub bind_address: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Replay,
            replay_file: None,
            speed: 1.0,
            loop_playback: false,
            bind_address: "0.0.0.0:5570".to_string(),
        }
    }
}

/// Topic names
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Occupancy grid updates
    pub map: String,
    /// Robot pose updates
    pub odometry: String,
    /// Trajectory updates; the remainder of the topic names the robot
    pub trajectory_prefix: String,
    /// Mission status updates; the remainder of the topic names the robot
    pub mission_status_prefix: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            map: "turtlebot3/map".to_string(),
            odometry: "turtlebot3/odom".to_string(),
            trajectory_prefix: "turtlebot/trajectory/".to_string(),
            mission_status_prefix: "turtlebot/mission_status/".to_string(),
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory artifacts are written to
    pub directory: String,
    /// Base file name of the live map
    pub live_name: String,
    /// Base file name of the mission map
    pub mission_name: String,
    /// Prefix of image URLs in notifications
    pub url_prefix: String,
    /// Also write the intermediate `.pgm`
    pub write_raster: bool,
    /// Also write the `.yaml` descriptor
    pub write_descriptor: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "maps".to_string(),
            live_name: "map_live".to_string(),
            mission_name: "mission_map".to_string(),
            url_prefix: "/".to_string(),
            write_raster: true,
            write_descriptor: true,
        }
    }
}

/// Render configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// World-to-row convention
    pub convention: AxisConvention,
    /// Robot marker half-width in cells
    pub marker_half_width: i32,
    /// Interpretation of incoming cell values
    pub palette: InputPalette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let overlay = OverlayConfig::default();
        Self {
            convention: overlay.convention,
            marker_half_width: overlay.marker_half_width,
            palette: InputPalette::Ros,
        }
    }
}

impl RenderConfig {
    /// Overlay settings for the compositor.
    pub fn overlay(&self) -> OverlayConfig {
        OverlayConfig {
            convention: self.convention,
            marker_half_width: self.marker_half_width,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
