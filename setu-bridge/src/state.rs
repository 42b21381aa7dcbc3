//! Latest-value bridge state.
//!
//! Holds the newest grid, pose and path. Renders never read the live state;
//! they take a [`RenderSnapshot`] under the read lock and work from that, so
//! updates arriving mid-render are seen by the next render only.

use std::collections::BTreeMap;
use std::sync::Arc;

use chitra_map::OccupancyGrid;
use chitra_map::core::Pose2D;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

/// Immutable inputs of one render.
#[derive(Clone, Debug)]
pub struct RenderSnapshot {
    /// Grid at capture time
    pub grid: Arc<OccupancyGrid>,
    /// Pose at capture time
    pub pose: Pose2D,
    /// Path at capture time
    pub path: Arc<[Pose2D]>,
    /// Monotonic state version the snapshot was taken at
    pub version: u64,
}

/// State answer for the REST layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    /// Latest pose
    pub robot_position: Pose2D,
    /// Latest path
    pub trajectory: Vec<Pose2D>,
    /// Whether a grid has been received
    pub has_map: bool,
    /// Grid dimensions `[width, height]`, if any
    pub map_size: Option<[usize; 2]>,
    /// Latest mission status per robot
    pub active_missions: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct Latest {
    grid: Option<Arc<OccupancyGrid>>,
    pose: Pose2D,
    path: Arc<[Pose2D]>,
    missions: BTreeMap<String, Value>,
    version: u64,
}

/// Shared latest-value state.
#[derive(Debug, Default)]
pub struct BridgeState {
    inner: RwLock<Latest>,
}

impl BridgeState {
    /// Empty state: no grid, pose at the origin, empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grid.
    pub fn set_grid(&self, grid: OccupancyGrid) {
        let mut inner = self.inner.write();
        inner.grid = Some(Arc::new(grid));
        inner.version += 1;
    }

    /// Replace the pose.
    pub fn set_pose(&self, pose: Pose2D) {
        let mut inner = self.inner.write();
        inner.pose = pose;
        inner.version += 1;
    }

    /// Replace the path, and the pose when one is given.
    pub fn set_path(&self, path: Vec<Pose2D>, pose: Option<Pose2D>) {
        let mut inner = self.inner.write();
        inner.path = path.into();
        if let Some(pose) = pose {
            inner.pose = pose;
        }
        inner.version += 1;
    }

    /// Record the latest mission status of a robot.
    pub fn set_mission_status(&self, robot: &str, status: Value) {
        self.inner.write().missions.insert(robot.to_string(), status);
    }

    /// Latest pose.
    pub fn pose(&self) -> Pose2D {
        self.inner.read().pose
    }

    /// Latest path.
    pub fn path(&self) -> Arc<[Pose2D]> {
        Arc::clone(&self.inner.read().path)
    }

    /// Whether a grid has been received.
    pub fn has_map(&self) -> bool {
        self.inner.read().grid.is_some()
    }

    /// Consistent copy of grid, pose and path; `None` until a grid arrives.
    pub fn snapshot(&self) -> Option<RenderSnapshot> {
        let inner = self.inner.read();
        let grid = inner.grid.as_ref()?;
        Some(RenderSnapshot {
            grid: Arc::clone(grid),
            pose: inner.pose,
            path: Arc::clone(&inner.path),
            version: inner.version,
        })
    }

    /// REST view of the state.
    pub fn current(&self) -> CurrentState {
        let inner = self.inner.read();
        CurrentState {
            robot_position: inner.pose,
            trajectory: inner.path.to_vec(),
            has_map: inner.grid.is_some(),
            map_size: inner.grid.as_ref().map(|g| [g.width(), g.height()]),
            active_missions: inner.missions.clone(),
        }
    }
}
