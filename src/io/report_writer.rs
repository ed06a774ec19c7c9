//! Report payload assembly.

use anyhow::{Context, Result};

use crate::ctx::Ctx;
use crate::schema::v1::{CalibrationInfo, GxReportV1, ScanInfo};

pub fn build_report(ctx: &Ctx, maps: crate::schema::v1::MapFiles) -> Result<GxReportV1> {
    let calibration = ctx.calibration.as_ref().context("calibration missing")?;
    let biomarkers = ctx.biomarkers.as_ref().context("biomarkers missing")?;
    let meta = &ctx.pairs.first().context("dixon pair missing")?.meta;

    let mut caveats = calibration.warnings.clone();
    caveats.extend(ctx.warnings.iter().cloned());

    Ok(GxReportV1 {
        tool: "xe-gasmap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: "v1".to_string(),
        subject_id: ctx.config.subject_id.clone(),
        scan: ScanInfo {
            scan_date: meta.scan_date.clone(),
            te90_us: meta.te90 * 1e6,
            tr_ms: meta.tr * 1e3,
            fa_gas: meta.fa_gas,
            fa_dis: meta.fa_dis,
            field_strength: meta.field_strength,
            fov_mm: meta.fov,
        },
        dual_acquisition: ctx.dual_acquisition(),
        mask_merge: ctx.dual_acquisition().then_some(ctx.config.mask_merge),
        segmentation_key: ctx.config.segmentation_key,
        reference_key: ctx.config.reference_key,
        calibration: CalibrationInfo {
            rbc_m_ratio: calibration.rbc_m_ratio,
            dissolved_phase: calibration.dissolved_phase,
            noise_floor: calibration.noise_floor,
            source: calibration.source,
        },
        biomarkers: biomarkers.clone(),
        caveats,
        maps,
    })
}
