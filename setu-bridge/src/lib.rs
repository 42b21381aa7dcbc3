//! SetuBridge - render bridge between the robot message bus and browsers
//!
//! Keeps the latest occupancy grid, robot pose and planned path, renders
//! them into map images with [`chitra_map`] and pushes notifications to
//! connected clients.
//!
//! ## Data Flow
//!
//! ```text
//! replay file / TCP frames
//!          │
//!          ▼
//!      Bridge ──▶ BridgeState
//!          │           │ snapshot
//!          │           ▼
//!          │     RenderWorker (live, mission) ──▶ ArtifactStore
//!          │           │                           (.pgm/.png/.yaml)
//!          ▼           ▼
//!       Notifier (map_update, trajectory_update, mission_status)
//! ```
//!
//! ## Modules
//!
//! - [`bridge`]: topic dispatch and client message handling
//! - [`config`]: TOML configuration
//! - [`messages`]: bus payloads, client messages, notifications
//! - [`state`]: latest grid, pose, path and mission statuses
//! - [`pipeline`]: one render from snapshot to stored artifacts
//! - [`worker`]: latest-wins render threads
//! - [`store`]: artifact storage
//! - [`notify`]: notification fan-out
//! - [`metrics`]: render and message counters
//! - [`io`]: replay and TCP input sources

pub mod bridge;
pub mod config;
pub mod error;
pub mod io;
pub mod messages;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod state;
pub mod store;
pub mod worker;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{Error, Result};
pub use messages::{ClientMessage, Envelope, Notification};
pub use notify::{Broadcaster, LogNotifier, Notifier};
pub use pipeline::RenderTarget;
pub use store::{ArtifactStore, FileStore, MemoryStore};
