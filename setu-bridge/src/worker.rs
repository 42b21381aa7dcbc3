//! Latest-wins render worker.
//!
//! One thread per [`RenderTarget`] with a single pending slot:
//!
//! ```text
//! submit(A) ─▶ [A]       worker takes A, renders
//! submit(B) ─▶ [B]       (A still rendering)
//! submit(C) ─▶ [C]       B superseded, never rendered
//!                        A done, worker takes C
//! ```
//!
//! Only the newest request is rendered. The in-flight render is never
//! interrupted. A superseded request that asked for its trajectory to be
//! announced passes that on to the request replacing it.
//!
//! A render that panics is counted as failed and the worker keeps going.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::pipeline::{RenderJob, RenderPipeline, RenderTarget};

/// How often an idle worker re-checks the running flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Slot {
    pending: Option<RenderJob>,
    busy: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    changed: Condvar,
}

/// Render worker handle.
pub struct RenderWorker {
    target: RenderTarget,
    shared: Arc<Shared>,
    pipeline: Arc<RenderPipeline>,
    handle: JoinHandle<()>,
}

impl RenderWorker {
    /// Spawn the worker thread for a target.
    pub fn spawn(
        target: RenderTarget,
        pipeline: Arc<RenderPipeline>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);
        let thread_pipeline = Arc::clone(&pipeline);

        let handle = thread::Builder::new()
            .name(format!("render-{}", target.name()))
            .spawn(move || run_worker_loop(target, thread_shared, thread_pipeline, running))?;

        Ok(Self {
            target,
            shared,
            pipeline,
            handle,
        })
    }

    /// Target this worker renders.
    pub fn target(&self) -> RenderTarget {
        self.target
    }

    /// Queue a job, replacing any job not yet started.
    ///
    /// Returns `true` if a pending job was replaced.
    pub fn submit(&self, mut job: RenderJob) -> bool {
        let replaced = {
            let mut slot = self.shared.slot.lock();
            let previous = slot.pending.take();
            if let Some(previous) = &previous {
                job.announce_trajectory |= previous.announce_trajectory;
            }
            slot.pending = Some(job);
            previous.is_some()
        };
        self.shared.changed.notify_all();

        if replaced {
            self.pipeline
                .metrics()
                .target(self.target)
                .superseded
                .fetch_add(1, Ordering::Relaxed);
            log::trace!("{} render request superseded", self.target.name());
        }
        replaced
    }

    /// Block until nothing is pending or rendering, or the timeout passes.
    ///
    /// Returns `true` if the worker went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.pending.is_some() || slot.busy {
            if self
                .shared
                .changed
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return !(slot.pending.is_some() || slot.busy);
            }
        }
        true
    }

    /// Wait for the thread to finish. Clear the running flag first.
    pub fn join(self) -> thread::Result<()> {
        self.shared.changed.notify_all();
        self.handle.join()
    }
}

fn run_worker_loop(
    target: RenderTarget,
    shared: Arc<Shared>,
    pipeline: Arc<RenderPipeline>,
    running: Arc<AtomicBool>,
) {
    log::info!("{} render worker started", target.name());

    while running.load(Ordering::Relaxed) {
        let job = {
            let mut slot = shared.slot.lock();
            if slot.pending.is_none() {
                shared.changed.wait_for(&mut slot, IDLE_POLL);
            }
            let job = slot.pending.take();
            slot.busy = job.is_some();
            job
        };

        let Some(job) = job else {
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.execute(target, &job)));
        if outcome.is_err() {
            pipeline
                .metrics()
                .target(target)
                .failed
                .fetch_add(1, Ordering::Relaxed);
            log::error!("{} render panicked", target.name());
        }

        shared.slot.lock().busy = false;
        shared.changed.notify_all();
    }

    log::info!("{} render worker stopped", target.name());
}
