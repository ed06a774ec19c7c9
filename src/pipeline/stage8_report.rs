use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::io::{self, maps_writer, report_writer};
use crate::pipeline::{RunState, Stage};

/// Assemble the report payload and atomically finalize the output
/// directory.
///
/// Everything was written under the staging directory; the rename here is
/// the only step that makes a run's outputs visible.
pub struct Stage8Report;

impl Stage8Report {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage8Report {
    fn name(&self) -> &'static str {
        "report"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let staging = ctx.output.staging_dir.clone();

        let maps = ctx.merged_maps.as_ref().context("merged maps missing")?;
        let corrected = ctx.merged_corrected.as_ref().context("corrected maps missing")?;
        let mask = ctx.merged_mask.as_ref().context("merged mask missing")?;
        let map_files = maps_writer::write_maps(&staging, maps, corrected, mask)?;

        let report = report_writer::build_report(ctx, map_files)?;
        let report_path = staging.join(format!("{}_report.json", ctx.config.subject_id));
        io::write_json(&report_path, &report)?;
        ctx.report = Some(report);

        let final_dir = ctx.output.final_dir.clone();
        if final_dir.exists() {
            std::fs::remove_dir_all(&final_dir)
                .with_context(|| format!("failed to clear {}", final_dir.display()))?;
        }
        std::fs::rename(&staging, &final_dir).with_context(|| {
            format!("failed to finalize {} -> {}", staging.display(), final_dir.display())
        })?;

        info!(out_dir = %final_dir.display(), "report_finalized");
        ctx.state = RunState::Reported;
        Ok(())
    }
}
