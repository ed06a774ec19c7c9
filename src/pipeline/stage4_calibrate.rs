use anyhow::{Context, Result};
use tracing::info;

use crate::corrections;
use crate::ctx::Ctx;
use crate::pipeline::{RunState, Stage};

/// Produce calibration-adjusted maps: gas normalization plus flip-angle,
/// T2*, and hemoglobin corrections per scan.
pub struct Stage4Calibrate;

impl Stage4Calibrate {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Calibrate {
    fn name(&self) -> &'static str {
        "calibrate"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let cal = ctx.calibration.as_ref().context("calibration missing")?;

        let mut corrected = Vec::with_capacity(ctx.maps.len());
        for (maps, pair) in ctx.maps.iter().zip(&ctx.pairs) {
            corrected.push(corrections::correct(
                maps,
                &pair.meta,
                cal.rbc_m_ratio,
                ctx.config.hb_correction_key,
                ctx.config.hb,
            )?);
        }

        info!(n_scans = corrected.len(), "maps_calibrated");
        ctx.corrected = corrected;
        ctx.state = RunState::Calibrated;
        Ok(())
    }
}
