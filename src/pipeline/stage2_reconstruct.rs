use anyhow::{Context, Result};
use tracing::info;

use crate::acquisition::DixonPair;
use crate::ctx::Ctx;
use crate::error::PipelineError;
use crate::pipeline::{RunState, Stage};
use crate::volume::ComplexVolume;

/// Materialize grid-checked Dixon pairs and the proton volume from the
/// loaded bundle.
///
/// Gridding raw k-space happened upstream; this stage validates what the
/// reconstruction collaborator produced.
pub struct Stage2Reconstruct;

impl Stage2Reconstruct {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Reconstruct {
    fn name(&self) -> &'static str {
        "reconstruct"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let input = ctx.input.take().context("bundle not loaded")?;

        let mut pairs = Vec::with_capacity(input.dixon.len());
        for scan in input.dixon {
            check_finite("gas", &scan.gas.volume)?;
            check_finite("dissolved", &scan.dissolved.volume)?;
            let pair =
                DixonPair::new(scan.gas.volume, scan.dissolved.volume, scan.dissolved.meta)?;
            pairs.push(pair);
        }
        if let Some(proton) = &input.proton {
            check_finite("proton", &proton.volume)?;
        }

        info!(
            n_pairs = pairs.len(),
            shape = ?pairs[0].shape(),
            "reconstructed_volumes_ready"
        );
        ctx.pairs = pairs;
        ctx.proton = input.proton.map(|p| p.volume);
        ctx.calibration_scan = input.calibration;
        ctx.state = RunState::Reconstructed;
        Ok(())
    }
}

fn check_finite(label: &str, volume: &ComplexVolume) -> Result<()> {
    if volume.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
        return Err(PipelineError::Decomposition(format!(
            "{label} volume contains non-finite samples"
        ))
        .into());
    }
    Ok(())
}
