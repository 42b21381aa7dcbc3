//! Render pipeline with persistence.
//!
//! ```text
//! RenderSnapshot ─▶ rasterize ─▶ put <base>.pgm ─▶ convert ─▶ put <base>.png
//!                                                                  │
//!                                 notify map_update ◀─ put <base>.yaml
//! ```
//!
//! The raster is stored before conversion, so a conversion failure leaves it
//! on disk. Any failure stops the remaining stages and suppresses the
//! notification.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use chitra_map::display::{self, DISPLAY_EXTENSION};
use chitra_map::{GeoDescriptor, Overlay, OverlayStats, RenderProfile};

use crate::config::{OutputConfig, RenderConfig};
use crate::error::Result;
use crate::messages::Notification;
use crate::metrics::RenderMetrics;
use crate::notify::Notifier;
use crate::state::RenderSnapshot;
use crate::store::ArtifactStore;

/// Which map a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Grid and robot marker, grayscale, as received
    Live,
    /// Grid, path and robot marker, colorized, rotated and mirrored
    Mission,
}

impl RenderTarget {
    /// Profile the target renders with.
    pub fn profile(self) -> &'static RenderProfile {
        match self {
            RenderTarget::Live => &RenderProfile::LIVE,
            RenderTarget::Mission => &RenderProfile::MISSION,
        }
    }

    /// Short name for logs and thread names.
    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

/// What to do with one snapshot.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Inputs
    pub snapshot: RenderSnapshot,
    /// Include the path in the `map_update` notification
    pub announce_trajectory: bool,
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// Target rendered
    pub target: RenderTarget,
    /// Names written to the store
    pub artifacts: Vec<String>,
    /// Overlay counters
    pub stats: OverlayStats,
    /// Snapshot version rendered
    pub version: u64,
}

/// Renders snapshots and stores the artifacts.
pub struct RenderPipeline {
    store: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<RenderMetrics>,
    output: OutputConfig,
    render: RenderConfig,
}

impl RenderPipeline {
    /// Create a pipeline.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<RenderMetrics>,
        output: OutputConfig,
        render: RenderConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics,
            output,
            render,
        }
    }

    /// Shared counters.
    pub fn metrics(&self) -> &Arc<RenderMetrics> {
        &self.metrics
    }

    /// Base file name of a target's artifacts.
    pub fn base_name(&self, target: RenderTarget) -> &str {
        match target {
            RenderTarget::Live => &self.output.live_name,
            RenderTarget::Mission => &self.output.mission_name,
        }
    }

    /// Image name of a target.
    pub fn image_name(&self, target: RenderTarget) -> String {
        format!("{}.{}", self.base_name(target), DISPLAY_EXTENSION)
    }

    /// URL clients fetch a target's image from.
    pub fn image_url(&self, target: RenderTarget) -> String {
        format!("{}{}", self.output.url_prefix, self.image_name(target))
    }

    /// Render a job, counting the outcome. Errors are logged, not returned.
    pub fn execute(&self, target: RenderTarget, job: &RenderJob) -> Option<RenderReport> {
        let counters = self.metrics.target(target);
        counters.started.fetch_add(1, Ordering::Relaxed);

        match self.run(target, job) {
            Ok(report) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                Some(report)
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("{} render failed: {}", target.name(), e);
                None
            }
        }
    }

    /// Render a job and store every artifact.
    pub fn run(&self, target: RenderTarget, job: &RenderJob) -> Result<RenderReport> {
        let start = Instant::now();
        let snapshot = &job.snapshot;
        let grid = snapshot.grid.as_ref();
        let profile = target.profile();
        let base = self.base_name(target);

        let overlay = match target {
            RenderTarget::Live => Overlay::robot(snapshot.pose),
            RenderTarget::Mission => Overlay::with_path(Some(snapshot.pose), &snapshot.path),
        };

        let (raster, stats) = chitra_map::rasterize(
            grid,
            self.render.palette,
            overlay,
            &self.render.overlay(),
            profile,
        )?;
        self.metrics.record_overlay(&stats);

        let mut artifacts = Vec::with_capacity(3);

        if self.output.write_raster {
            let name = format!("{}.pgm", base);
            self.store.put(&name, raster.as_bytes())?;
            artifacts.push(name);
        }

        let image = display::convert(raster.as_bytes(), grid.width(), grid.height(), profile)?;
        let image_name = self.image_name(target);
        self.store.put(&image_name, &image.bytes)?;
        artifacts.push(image_name.clone());

        if self.output.write_descriptor {
            let descriptor =
                GeoDescriptor::centered(image_name, grid.resolution(), grid.width(), grid.height());
            let name = format!("{}.yaml", base);
            self.store.put(&name, descriptor.to_yaml().as_bytes())?;
            artifacts.push(name);
        }

        let trajectory = job.announce_trajectory.then(|| snapshot.path.to_vec());
        self.notifier
            .notify(&Notification::map_update(self.image_url(target), trajectory));

        log::debug!(
            "{} render v{} done in {:?} ({}x{}, {} cells clipped)",
            target.name(),
            snapshot.version,
            start.elapsed(),
            grid.width(),
            grid.height(),
            stats.clipped()
        );

        Ok(RenderReport {
            target,
            artifacts,
            stats,
            version: snapshot.version,
        })
    }
}
