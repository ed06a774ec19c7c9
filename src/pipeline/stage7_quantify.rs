use anyhow::{Context, Result};
use tracing::info;

use crate::biomarkers::quantify;
use crate::ctx::Ctx;
use crate::pipeline::{RunState, Stage};
use crate::reference::ReferenceCohort;

/// Compute masked biomarkers against the configured reference cohort.
pub struct Stage7Quantify;

impl Stage7Quantify {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage7Quantify {
    fn name(&self) -> &'static str {
        "quantify"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let maps = ctx.merged_maps.as_ref().context("merged maps missing")?;
        let corrected = ctx.merged_corrected.as_ref().context("corrected maps missing")?;
        let mask = ctx.merged_mask.as_ref().context("merged mask missing")?;
        let reference = ReferenceCohort::for_key(ctx.config.reference_key);
        let fov = ctx.pairs.first().context("dixon pair missing")?.meta.fov;

        let biomarkers = quantify::quantify(maps, corrected, mask, &reference, fov)?;
        info!(
            vent_defect_pct = biomarkers.vent.defect_pct,
            rbc_m_ratio = biomarkers.rbc_m_ratio,
            "quantification_done"
        );
        ctx.biomarkers = Some(biomarkers);
        ctx.state = RunState::Quantified;
        Ok(())
    }
}
