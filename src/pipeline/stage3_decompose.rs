use anyhow::{Context, Result};
use tracing::info;

use crate::calibration;
use crate::ctx::Ctx;
use crate::decompose;
use crate::io::artifact::{self, Snapshot};
use crate::pipeline::{RunState, Stage};
use crate::volume::MaskVolume;

/// Resolve the subject calibration and decompose every Dixon pair, then
/// snapshot the result so later runs can resume here.
pub struct Stage3Decompose;

impl Stage3Decompose {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Decompose {
    fn name(&self) -> &'static str {
        "decompose"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let primary = ctx.pairs.first().context("no dixon pair reconstructed")?;
        let cal = calibration::resolve(
            ctx.config.rbc_m_ratio,
            primary,
            ctx.calibration_scan.as_ref(),
        )?;
        info!(
            ratio = cal.rbc_m_ratio,
            source = ?cal.source,
            noise_floor = cal.noise_floor,
            "calibration_resolved"
        );

        let mut maps = Vec::with_capacity(ctx.pairs.len());
        for pair in &ctx.pairs {
            maps.push(decompose::decompose(pair, &cal)?);
        }

        ctx.calibration = Some(cal);
        ctx.maps = maps;
        write_snapshot(ctx, None)?;
        ctx.state = RunState::Decomposed;
        Ok(())
    }
}

/// Write the resume snapshot into the staging directory.
pub(crate) fn write_snapshot(ctx: &Ctx, masks: Option<Vec<MaskVolume>>) -> Result<()> {
    let snapshot = Snapshot {
        subject_id: ctx.config.subject_id.clone(),
        pairs: ctx.pairs.clone(),
        proton: ctx.proton.clone(),
        calibration_scan: ctx.calibration_scan.clone(),
        calibration: ctx.calibration.clone().context("calibration missing")?,
        maps: ctx.maps.clone(),
        masks,
    };
    let path = ctx
        .output
        .staging_dir
        .join(artifact::snapshot_filename(&ctx.config.subject_id));
    artifact::write_snapshot(&path, &snapshot)?;
    info!(path = %path.display(), "snapshot_written");
    Ok(())
}
