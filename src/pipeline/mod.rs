use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ctx::Ctx;

pub mod stage1_load;
pub mod stage1_resume;
pub mod stage2_reconstruct;
pub mod stage3_decompose;
pub mod stage4_calibrate;
pub mod stage5_segment;
pub mod stage6_register;
pub mod stage7_quantify;
pub mod stage8_report;

/// Run progress. `Reported` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Loaded,
    Reconstructed,
    Decomposed,
    Calibrated,
    Segmented,
    Registered,
    Quantified,
    Reported,
    Failed { stage: String, cause: String },
}

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

/// Stage list for a full run from raw acquisitions.
pub fn full_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(stage1_load::Stage1Load::new()),
        Box::new(stage2_reconstruct::Stage2Reconstruct::new()),
        Box::new(stage3_decompose::Stage3Decompose::new()),
        Box::new(stage4_calibrate::Stage4Calibrate::new()),
        Box::new(stage5_segment::Stage5Segment::new()),
        Box::new(stage6_register::Stage6Register::new()),
        Box::new(stage7_quantify::Stage7Quantify::new()),
        Box::new(stage8_report::Stage8Report::new()),
    ]
}

/// Stage list for a reprocess run resuming at `Decomposed`.
pub fn reprocess_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(stage1_resume::Stage1Resume::new()),
        Box::new(stage4_calibrate::Stage4Calibrate::new()),
        Box::new(stage5_segment::Stage5Segment::new()),
        Box::new(stage6_register::Stage6Register::new()),
        Box::new(stage7_quantify::Stage7Quantify::new()),
        Box::new(stage8_report::Stage8Report::new()),
    ]
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Run all stages in order.
    ///
    /// The first failure records `Failed { stage, cause }`, removes the
    /// staging directory so no partial output survives, and aborts.
    pub fn run(&self, ctx: &mut Ctx) -> Result<()> {
        for stage in &self.stages {
            let start = Instant::now();
            info!(stage = stage.name(), "stage started");
            if let Err(err) = stage.run(ctx) {
                let elapsed_ms = start.elapsed().as_millis();
                let kind = err
                    .downcast_ref::<crate::error::PipelineError>()
                    .map(|e| e.kind())
                    .unwrap_or("other");
                warn!(
                    stage = stage.name(),
                    kind,
                    elapsed_ms = elapsed_ms as u64,
                    "stage failed"
                );
                ctx.state = RunState::Failed {
                    stage: stage.name().to_string(),
                    cause: format!("{err:#}"),
                };
                discard_staging(ctx);
                return Err(err.context(format!("stage {} failed", stage.name())));
            }
            let elapsed_ms = start.elapsed().as_millis();
            info!(
                stage = stage.name(),
                elapsed_ms = elapsed_ms as u64,
                "stage finished"
            );
        }
        Ok(())
    }
}

fn discard_staging(ctx: &Ctx) {
    let staging = &ctx.output.staging_dir;
    if staging.exists() {
        if let Err(e) = std::fs::remove_dir_all(staging) {
            warn!(dir = %staging.display(), error = %e, "failed to remove staging dir");
        }
    }
}
