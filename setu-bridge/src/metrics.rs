//! Process-wide render counters.
//!
//! Lock-free atomics, bumped from the bridge and the render workers and read
//! as a [`MetricsSnapshot`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chitra_map::OverlayStats;
use serde::Serialize;

use crate::pipeline::RenderTarget;

/// Counters for one render target.
#[derive(Debug, Default)]
pub struct TargetCounters {
    /// Renders picked up by the worker
    pub started: AtomicU64,
    /// Renders that wrote every artifact
    pub completed: AtomicU64,
    /// Renders that failed at any stage
    pub failed: AtomicU64,
    /// Requests replaced before a worker picked them up
    pub superseded: AtomicU64,
}

impl TargetCounters {
    fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
        }
    }
}

/// Render and message counters.
#[derive(Debug, Default)]
pub struct RenderMetrics {
    /// Live map renders
    pub live: TargetCounters,
    /// Mission map renders
    pub mission: TargetCounters,
    /// Robot marker writes dropped outside the grid
    pub marker_clipped: AtomicU64,
    /// Path writes dropped outside the grid
    pub path_clipped: AtomicU64,
    /// Overlay poses skipped as invalid
    pub invalid_poses: AtomicU64,
    /// Bus messages handled
    pub messages: AtomicU64,
    /// Bus messages dropped because they failed to decode or validate
    pub decode_errors: AtomicU64,
}

impl RenderMetrics {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for a target.
    pub fn target(&self, target: RenderTarget) -> &TargetCounters {
        match target {
            RenderTarget::Live => &self.live,
            RenderTarget::Mission => &self.mission,
        }
    }

    /// Add an overlay result.
    pub fn record_overlay(&self, stats: &OverlayStats) {
        self.marker_clipped
            .fetch_add(stats.marker_clipped as u64, Ordering::Relaxed);
        self.path_clipped
            .fetch_add(stats.path_clipped as u64, Ordering::Relaxed);
        self.invalid_poses
            .fetch_add(stats.invalid_poses as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            live: self.live.snapshot(),
            mission: self.mission.snapshot(),
            marker_clipped: self.marker_clipped.load(Ordering::Relaxed),
            path_clipped: self.path_clipped.load(Ordering::Relaxed),
            invalid_poses: self.invalid_poses.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Copy of one target's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TargetSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub superseded: u64,
}

/// Copy of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub live: TargetSnapshot,
    pub mission: TargetSnapshot,
    pub marker_clipped: u64,
    pub path_clipped: u64,
    pub invalid_poses: u64,
    pub messages: u64,
    pub decode_errors: u64,
}

impl fmt::Display for TargetSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} started, {} completed, {} failed, {} superseded",
            self.started, self.completed, self.failed, self.superseded
        )
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "live: {}", self.live)?;
        writeln!(f, "mission: {}", self.mission)?;
        write!(
            f,
            "messages: {} ({} dropped), clipped: {} marker / {} path, invalid poses: {}",
            self.messages,
            self.decode_errors,
            self.marker_clipped,
            self.path_clipped,
            self.invalid_poses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_accumulates() {
        let metrics = RenderMetrics::new();
        let stats = OverlayStats {
            marker_cells: 16,
            marker_clipped: 33,
            path_cells: 3,
            path_clipped: 4,
            invalid_poses: 1,
        };
        metrics.record_overlay(&stats);
        metrics.record_overlay(&stats);

        let snap = metrics.snapshot();
        assert_eq!(snap.marker_clipped, 66);
        assert_eq!(snap.path_clipped, 8);
        assert_eq!(snap.invalid_poses, 2);
    }

    #[test]
    fn test_target_counters() {
        let metrics = RenderMetrics::new();
        metrics
            .target(RenderTarget::Mission)
            .failed
            .fetch_add(1, Ordering::Relaxed);
        let snap = metrics.snapshot();
        assert_eq!(snap.mission.failed, 1);
        assert_eq!(snap.live, TargetSnapshot::default());
        assert!(snap.to_string().contains("mission: 0 started, 0 completed, 1 failed"));
    }
}
