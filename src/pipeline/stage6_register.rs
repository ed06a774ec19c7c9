use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::RegistrationKey;
use crate::corrections::CorrectedMaps;
use crate::ctx::Ctx;
use crate::decompose::CompartmentMaps;
use crate::error::PipelineError;
use crate::pipeline::{RunState, Stage};
use crate::registration;
use crate::segmentation;
use crate::volume;

/// Spatial alignment.
///
/// Dual acquisition: scan 2 is registered onto scan 1's grid and the
/// per-scan masks and maps merge; a registration failure aborts the run.
/// Single acquisition: the proton image is optionally registered onto
/// the gas image, and a failure only downgrades to the unregistered
/// proton.
pub struct Stage6Register;

impl Stage6Register {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Register {
    fn name(&self) -> &'static str {
        "register"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        if ctx.dual_acquisition() {
            merge_dual(ctx)?;
        } else {
            ctx.merged_mask = Some(ctx.masks[0].clone());
            ctx.merged_maps = Some(ctx.maps[0].clone());
            ctx.merged_corrected = Some(ctx.corrected[0].clone());
            register_proton(ctx)?;
        }
        ctx.state = RunState::Registered;
        Ok(())
    }
}

fn merge_dual(ctx: &mut Ctx) -> Result<()> {
    let registrar = ctx.registrar.as_deref().ok_or_else(|| {
        PipelineError::Registration(
            "dual acquisition requires a registration capability".to_string(),
        )
    })?;

    let fixed_shape = ctx.maps[0].gas.dim();
    let transform = registrar.register(&ctx.maps[1].gas, &ctx.maps[0].gas)?;

    let mask1 = transform.apply_to_mask(&ctx.masks[1], fixed_shape);
    let merged_mask = segmentation::merge_masks(&ctx.masks[0], &mask1, ctx.config.mask_merge)?;

    let maps1 = CompartmentMaps {
        gas: transform.apply_to_map(&ctx.maps[1].gas, fixed_shape),
        membrane: transform.apply_to_map(&ctx.maps[1].membrane, fixed_shape),
        rbc: transform.apply_to_map(&ctx.maps[1].rbc, fixed_shape),
    };
    let merged_maps = CompartmentMaps {
        gas: volume::mean_of(&ctx.maps[0].gas, &maps1.gas),
        membrane: volume::mean_of(&ctx.maps[0].membrane, &maps1.membrane),
        rbc: volume::mean_of(&ctx.maps[0].rbc, &maps1.rbc),
    };

    let corrected0 = &ctx.corrected[0];
    let merged_corrected = CorrectedMaps {
        rbc2gas: volume::mean_of(
            &corrected0.rbc2gas,
            &transform.apply_to_map(&ctx.corrected[1].rbc2gas, fixed_shape),
        ),
        membrane2gas: volume::mean_of(
            &corrected0.membrane2gas,
            &transform.apply_to_map(&ctx.corrected[1].membrane2gas, fixed_shape),
        ),
        rbc_m_ratio: corrected0.rbc_m_ratio,
        rbc_hb_factor: corrected0.rbc_hb_factor,
        membrane_hb_factor: corrected0.membrane_hb_factor,
    };

    info!(mask_merge = ?ctx.config.mask_merge, "dual_acquisition_merged");
    ctx.merged_mask = Some(merged_mask);
    ctx.merged_maps = Some(merged_maps);
    ctx.merged_corrected = Some(merged_corrected);
    Ok(())
}

fn register_proton(ctx: &mut Ctx) -> Result<()> {
    let Some(proton) = ctx.proton.as_ref() else {
        return Ok(());
    };
    let proton_mag = volume::magnitude(proton);

    match ctx.config.registration_key {
        RegistrationKey::Skip => {
            ctx.proton_reg = Some(proton_mag);
        }
        RegistrationKey::Manual => {
            let path = ctx
                .config
                .manual_reg_filepath
                .as_ref()
                .context("manual_reg_filepath missing")?;
            ctx.proton_reg = Some(registration::read_scalar_nifti(path)?);
            info!(path = %path.display(), "manual_proton_registration_loaded");
        }
        RegistrationKey::Proton2Gas => {
            let fixed_shape = ctx.maps[0].gas.dim();
            match ctx.registrar.as_deref() {
                Some(registrar) => match registrar.register(&proton_mag, &ctx.maps[0].gas) {
                    Ok(transform) => {
                        ctx.proton_reg = Some(transform.apply_to_map(&proton_mag, fixed_shape));
                        info!("proton_registered_to_gas");
                    }
                    Err(e) => {
                        // non-fatal for a single scan
                        warn!(error = %e, "proton_registration_failed");
                        ctx.warnings.push(format!("proton registration failed: {e}"));
                        ctx.proton_reg = Some(proton_mag);
                    }
                },
                None => {
                    warn!("no registration capability, proton left unregistered");
                    ctx.warnings
                        .push("proton registration skipped: capability unavailable".to_string());
                    ctx.proton_reg = Some(proton_mag);
                }
            }
        }
    }
    Ok(())
}
