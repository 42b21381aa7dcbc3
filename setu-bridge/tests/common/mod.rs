//! Shared helpers for SetuBridge integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use setu_bridge::{ArtifactStore, Bridge, Config, FileStore, Notification, Notifier};
use tempfile::TempDir;

/// Generous bound for renders in CI.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Notifier that keeps everything it is handed.
#[derive(Default)]
pub struct Recorder {
    pub sent: Mutex<Vec<Notification>>,
}

impl Notifier for Recorder {
    fn notify(&self, notification: &Notification) {
        self.sent.lock().push(notification.clone());
    }
}

impl Recorder {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(|n| n.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.sent.lock().iter().filter(|n| n.kind() == kind).count()
    }
}

/// Bridge writing into a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<FileStore>,
    pub recorder: Arc<Recorder>,
    pub running: Arc<AtomicBool>,
    pub bridge: Bridge,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path().join("maps")).unwrap());
        let recorder = Arc::new(Recorder::default());
        let running = Arc::new(AtomicBool::new(true));
        let bridge = Bridge::new(
            &config,
            store.clone() as Arc<dyn ArtifactStore>,
            recorder.clone(),
            running.clone(),
        )
        .unwrap();
        Self {
            dir,
            store,
            recorder,
            running,
            bridge,
        }
    }

    pub fn artifact(&self, name: &str) -> Option<Vec<u8>> {
        self.store.get(name).unwrap()
    }

    pub fn settle(&self) {
        assert!(self.bridge.wait_idle(RENDER_TIMEOUT), "renders did not finish");
    }

    pub fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        self.bridge.shutdown();
    }
}

/// All-free ROS grid payload.
pub fn free_grid(width: usize, height: usize, resolution: f64) -> Value {
    json!({
        "width": width,
        "height": height,
        "resolution": resolution,
        "origin": {"position": {"x": 0.0, "y": 0.0, "z": 0.0}},
        "data": vec![0; width * height],
    })
}

pub fn pose(x: f64, y: f64) -> Value {
    json!({"x": x, "y": y, "z": 0.0, "orientation": {"w": 1.0}})
}

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
