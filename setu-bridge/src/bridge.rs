//! Bridge between the robot bus and browser clients.
//!
//! ```text
//!   input source ──▶ handle_message ──▶ BridgeState (latest grid/pose/path)
//!                         │                    │ snapshot
//!                         │                    ▼
//!                         │            RenderWorker (live / mission)
//!                         │                    │
//!                         └──▶ Notifier ◀──────┘ map_update
//!
//!   browser ──▶ handle_client ──▶ same path
//! ```
//!
//! | Topic                          | Effect |
//! |--------------------------------|--------|
//! | `topics.map`                   | store grid, render live |
//! | `topics.odometry`              | store pose, `trajectory_update`, render mission |
//! | `topics.trajectory_prefix*`    | store path (+pose), `trajectory_update`, render mission |
//! | `topics.mission_status_prefix*`| `mission_status` pass-through |
//!
//! A message that fails to decode or validate is logged, counted and
//! dropped; it never affects state or later messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::config::{Config, TopicConfig};
use crate::error::{Error, Result};
use crate::messages::{BusMessage, ClientMessage, Envelope, Notification};
use crate::metrics::RenderMetrics;
use crate::notify::Notifier;
use crate::pipeline::{RenderJob, RenderPipeline, RenderTarget};
use crate::state::{BridgeState, CurrentState};
use crate::store::ArtifactStore;
use crate::worker::RenderWorker;

/// Bridge context: state, workers, notifier.
pub struct Bridge {
    topics: TopicConfig,
    state: Arc<BridgeState>,
    pipeline: Arc<RenderPipeline>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<RenderMetrics>,
    live: RenderWorker,
    mission: RenderWorker,
}

impl Bridge {
    /// Build the bridge and spawn its render workers.
    ///
    /// Workers run until `running` is cleared; then call [`Bridge::shutdown`].
    pub fn new(
        config: &Config,
        store: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let metrics = Arc::new(RenderMetrics::new());
        let pipeline = Arc::new(RenderPipeline::new(
            store,
            Arc::clone(&notifier),
            Arc::clone(&metrics),
            config.output.clone(),
            config.render.clone(),
        ));

        let live = RenderWorker::spawn(RenderTarget::Live, Arc::clone(&pipeline), Arc::clone(&running))
            .map_err(|e| Error::Other(format!("Failed to spawn live render worker: {}", e)))?;
        let mission =
            RenderWorker::spawn(RenderTarget::Mission, Arc::clone(&pipeline), running)
                .map_err(|e| Error::Other(format!("Failed to spawn mission render worker: {}", e)))?;

        Ok(Self {
            topics: config.topics.clone(),
            state: Arc::new(BridgeState::new()),
            pipeline,
            notifier,
            metrics,
            live,
            mission,
        })
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<BridgeState> {
        &self.state
    }

    /// Shared counters.
    pub fn metrics(&self) -> &Arc<RenderMetrics> {
        &self.metrics
    }

    /// Render pipeline (artifact naming, direct renders).
    pub fn pipeline(&self) -> &Arc<RenderPipeline> {
        &self.pipeline
    }

    /// Handle one bus message. Errors are already logged and counted.
    pub fn handle_message(&self, topic: &str, payload: Value) -> Result<()> {
        self.metrics.messages.fetch_add(1, Ordering::Relaxed);

        let result = BusMessage::decode(topic, payload, &self.topics).and_then(|msg| self.apply(msg));
        if let Err(ref e) = result {
            self.metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
            log::warn!("Dropped message on {}: {}", topic, e);
        }
        result
    }

    /// Handle an enveloped bus message.
    pub fn handle_envelope(&self, envelope: Envelope) -> Result<()> {
        self.handle_message(&envelope.topic, envelope.payload)
    }

    fn apply(&self, msg: BusMessage) -> Result<()> {
        match msg {
            BusMessage::Map(grid) => {
                let grid = grid.into_grid()?;
                log::info!(
                    "Map received: {}x{} @ {} m/cell",
                    grid.width(),
                    grid.height(),
                    grid.resolution()
                );
                self.state.set_grid(grid);
                self.request_render(RenderTarget::Live, false);
            }
            BusMessage::Odometry(pose) => {
                self.state.set_pose(pose.pose());
                log::debug!("Pose updated: ({:.3}, {:.3})", pose.x, pose.y);
                self.announce_trajectory();
                self.request_render(RenderTarget::Mission, false);
            }
            BusMessage::Trajectory { robot, path } => {
                log::debug!("Trajectory from {}: {} points", robot, path.trajectory.len());
                self.state.set_path(path.trajectory, path.current_position);
                self.announce_trajectory();
                self.request_render(RenderTarget::Mission, false);
            }
            BusMessage::MissionStatus { robot, status } => {
                log::info!("Mission status from {}: {}", robot, status);
                self.state.set_mission_status(&robot, status.clone());
                self.notifier.notify(&Notification::mission_status(status));
            }
            BusMessage::Ignored => {}
        }
        Ok(())
    }

    /// Handle a message from a browser client.
    pub fn handle_client(&self, msg: ClientMessage) {
        match msg {
            ClientMessage::TrajectoryUpdate { trajectory } => {
                log::debug!("Client trajectory: {} points", trajectory.len());
                self.state.set_path(trajectory, None);
                self.request_render(RenderTarget::Mission, true);
            }
            ClientMessage::RequestMapUpdate => {
                let url = self.pipeline.image_url(RenderTarget::Mission);
                let trajectory = self.state.path().to_vec();
                self.notifier
                    .notify(&Notification::map_update(url, Some(trajectory)));
            }
        }
    }

    /// Parse and handle a browser text frame.
    pub fn handle_client_text(&self, text: &str) -> Result<()> {
        let msg = ClientMessage::parse(text).inspect_err(|e| {
            log::warn!("Dropped client message: {}", e);
        })?;
        self.handle_client(msg);
        Ok(())
    }

    /// State for the REST layer.
    pub fn current_state(&self) -> CurrentState {
        self.state.current()
    }

    /// Queue a render of the current state. Without a grid this only logs.
    ///
    /// Returns `false` when there was nothing to render.
    pub fn request_render(&self, target: RenderTarget, announce_trajectory: bool) -> bool {
        let Some(snapshot) = self.state.snapshot() else {
            log::warn!("No map yet, skipping {} render", target.name());
            return false;
        };
        let job = RenderJob {
            snapshot,
            announce_trajectory,
        };
        match target {
            RenderTarget::Live => self.live.submit(job),
            RenderTarget::Mission => self.mission.submit(job),
        };
        true
    }

    /// Wait for both workers to finish queued renders.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.live.wait_idle(timeout) && self.mission.wait_idle(timeout)
    }

    fn announce_trajectory(&self) {
        let trajectory = self.state.path().to_vec();
        let pose = self.state.pose();
        self.notifier
            .notify(&Notification::trajectory_update(trajectory, pose));
    }

    /// Join the render workers. The running flag must already be cleared.
    pub fn shutdown(self) {
        for worker in [self.live, self.mission] {
            let target = worker.target();
            if worker.join().is_err() {
                log::error!("{} render worker panicked", target.name());
            }
        }
    }
}
