//! Run harness: builds the runtime, context, world and orchestrator for one
//! simulation run.

use crate::context::SimContext;
use crate::exporter::SimExport;
use crate::scenarios::ScenarioId;
use crate::viewer::{FrameSink, Viewer};
use covert_core::{Orchestrator, SimError, SimOutcome, SimParams, World};
use covert_env::{CovertContext, TokioContext};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Seed used for virtual-time runs when none is given.
pub const DEFAULT_VIRTUAL_SEED: u64 = 42;

/// Everything needed to start one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: SimParams,
    pub scenario: ScenarioId,
    pub seed: Option<u64>,
    /// Drive the run on a paused clock that jumps to the next timer
    pub virtual_time: bool,
    pub view_interval: Duration,
    pub export: Option<PathBuf>,
    /// Install a Ctrl-C handler that ends the run
    pub handle_ctrl_c: bool,
}

impl RunConfig {
    pub fn new(params: SimParams, scenario: ScenarioId) -> Self {
        Self {
            params,
            scenario,
            seed: None,
            virtual_time: false,
            view_interval: Duration::from_secs(5),
            export: None,
            handle_ctrl_c: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_virtual_time(mut self, virtual_time: bool) -> Self {
        self.virtual_time = virtual_time;
        self
    }

    /// Seed the run will actually use (0 when unseeded).
    pub fn effective_seed(&self) -> u64 {
        match (self.seed, self.virtual_time) {
            (Some(seed), _) => seed,
            (None, true) => DEFAULT_VIRTUAL_SEED,
            (None, false) => 0,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub scenario: String,
    pub seed: u64,
    pub virtual_time: bool,
    pub outcome: SimOutcome,
}

/// Runs one simulation to completion on a fresh runtime.
pub fn run(config: RunConfig) -> Result<RunReport, SimError> {
    let runtime = if config.virtual_time {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
    }
    .map_err(SimError::Runtime)?;

    runtime.block_on(run_async(config))
}

/// Runs one simulation on the current runtime.
pub async fn run_async(config: RunConfig) -> Result<RunReport, SimError> {
    let seed = config.effective_seed();
    if config.seed.is_some() || config.virtual_time {
        drive(SimContext::shared(seed), &config).await
    } else {
        drive(TokioContext::shared(), &config).await
    }
}

async fn drive<C: CovertContext>(ctx: Arc<C>, config: &RunConfig) -> Result<RunReport, SimError> {
    let seed = ctx.seed();
    let mut export = SimExport::new(config.scenario.name(), seed, config.virtual_time);

    info!(
        run_id = %export.run_id,
        scenario = config.scenario.name(),
        seed,
        virtual_time = config.virtual_time,
        "Starting run"
    );

    let world = World::new(ctx, config.params.clone());
    let sink = FrameSink::new();
    let mut viewer = Viewer::new(world.clone(), config.view_interval);
    if config.export.is_some() {
        viewer = viewer.recording(sink.clone());
    }
    let orchestrator = Orchestrator::new(world).with_viewer(viewer.run());

    let outcome = if config.handle_ctrl_c {
        orchestrator.run_until(ctrl_c()).await?
    } else {
        orchestrator.run().await?
    };

    if let Some(path) = &config.export {
        for frame in sink.take() {
            export.add_frame(frame);
        }
        export.finalize(outcome.clone());
        match export.write_to_file(path) {
            Ok(()) => info!(path = %path.display(), frames = export.frames.len(), "Exported run"),
            Err(e) => error!(path = %path.display(), "Failed to write export: {}", e),
        }
    }

    Ok(RunReport {
        run_id: export.run_id,
        scenario: config.scenario.name().to_string(),
        seed,
        virtual_time: config.virtual_time,
        outcome,
    })
}

/// Completes on Ctrl-C. If no handler can be installed it never completes.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
