//! Read-only visualization consumer.
//!
//! Samples the store on a fixed interval, logs a one-line summary and
//! optionally records frames for export. It never writes to the store.

use crate::exporter::SimFrame;
use covert_core::World;
use covert_env::CovertContext;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

/// Shared buffer of recorded frames.
///
/// The viewer task is aborted at shutdown, so frames are handed back through
/// this buffer rather than a return value.
#[derive(Debug, Clone, Default)]
pub struct FrameSink {
    frames: Arc<Mutex<Vec<SimFrame>>>,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: SimFrame) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
    }

    /// Takes every frame recorded so far.
    pub fn take(&self) -> Vec<SimFrame> {
        std::mem::take(&mut *self.frames.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodic snapshot sampler.
pub struct Viewer<C> {
    world: World<C>,
    interval: Duration,
    sink: Option<FrameSink>,
}

impl<C: CovertContext> Viewer<C> {
    pub fn new(world: World<C>, interval: Duration) -> Self {
        Self {
            world,
            interval,
            sink: None,
        }
    }

    /// Records every sampled snapshot into `sink`.
    pub fn recording(mut self, sink: FrameSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Samples until the run flag drops.
    pub async fn run(self) {
        let start = self.world.ctx.now();
        while self.world.is_running() {
            self.world.ctx.sleep(self.interval).await;
            let time_sec = self.world.ctx.now().saturating_sub(start).as_secs_f64();
            let snapshot = self.world.store.snapshot();
            info!("t={:>6.1}s | {}", time_sec, snapshot.summary());
            if let Some(sink) = &self.sink {
                sink.push(SimFrame { time_sec, snapshot });
            }
        }
    }
}
