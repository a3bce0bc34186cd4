//! JSON exporter for offline visualization.
//!
//! Collects periodic store snapshots and the final outcome of a run into a
//! single document.

use covert_core::{SimOutcome, StoreSnapshot};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub snapshot: StoreSnapshot,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Unique id of this run
    pub run_id: Uuid,

    /// Scenario name
    pub scenario: String,

    /// Seed used (0 when unseeded)
    pub seed: u64,

    pub virtual_time: bool,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SimOutcome>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, virtual_time: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            seed,
            virtual_time,
            duration_sec: 0.0,
            frames: Vec::new(),
            outcome: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, outcome: SimOutcome) {
        self.duration_sec = outcome.elapsed_secs;
        self.outcome = Some(outcome);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}
