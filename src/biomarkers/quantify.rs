//! Biomarker quantification against a healthy reference cohort.

use tracing::info;

use crate::biomarkers::{Biomarkers, CompartmentStats};
use crate::corrections::CorrectedMaps;
use crate::decompose::CompartmentMaps;
use crate::error::PipelineError;
use crate::math::{binning, stats};
use crate::reference::ReferenceCohort;
use crate::volume::{self, MaskVolume, ScalarVolume};

/// Liters per cubic-centimeter scale for inflation volumes.
const FOV_INFLATION_SCALE_3D: f64 = 1000.0;
/// Membrane coefficient of the gas-uptake estimate.
const KCO_ALPHA: f64 = 11.2;
/// RBC coefficient of the gas-uptake estimate.
const KCO_BETA: f64 = 14.6;
/// Alveolar-volume scaling of the ventilated volume.
const VA_ALPHA: f64 = 1.43;

/// Compute all biomarkers restricted to the lung mask.
///
/// The ventilation image is normalized to its 99th masked percentile
/// before binning; dissolved statistics run on the ventilated sub-mask
/// (masked voxels above the ventilation defect bin). An empty mask is a
/// precondition failure, never a zero-valued result.
pub fn quantify(
    maps: &CompartmentMaps,
    corrected: &CorrectedMaps,
    mask: &MaskVolume,
    reference: &ReferenceCohort,
    fov_mm: f64,
) -> Result<Biomarkers, PipelineError> {
    if !volume::same_grid(&maps.gas, mask) {
        return Err(PipelineError::Quantification(format!(
            "mask grid {:?} does not match map grid {:?}",
            mask.dim(),
            maps.gas.dim()
        )));
    }
    let n_masked = volume::mask_count(mask);
    if n_masked == 0 {
        return Err(PipelineError::Quantification(
            "empty lung mask after reconciliation".to_string(),
        ));
    }

    let vent_norm = normalize_percentile(&maps.gas, mask);
    let vent_binned = binning::linear_bin(&vent_norm, mask, &reference.threshold_vent);
    let mask_vent = binning::ventilated_mask(&vent_binned, mask);
    if volume::mask_count(&mask_vent) == 0 {
        return Err(PipelineError::Quantification(
            "no ventilated voxels above the defect bin".to_string(),
        ));
    }

    let rbc_binned = binning::linear_bin(&corrected.rbc2gas, &mask_vent, &reference.threshold_rbc);
    let membrane_binned =
        binning::linear_bin(&corrected.membrane2gas, &mask_vent, &reference.threshold_membrane);

    let vent = compartment_stats(&vent_norm, &maps.gas, &vent_binned, mask, mask, &[5, 6]);
    let rbc =
        compartment_stats(&corrected.rbc2gas, &maps.rbc, &rbc_binned, &mask_vent, mask, &[5, 6]);
    let membrane = compartment_stats(
        &corrected.membrane2gas,
        &maps.membrane,
        &membrane_binned,
        &mask_vent,
        mask,
        &[6, 7, 8],
    );

    let (nx, _, _) = maps.gas.dim();
    let voxel_ml = (fov_mm / nx as f64 / 10.0).powi(3);
    let inflation = n_masked as f64 * voxel_ml / FOV_INFLATION_SCALE_3D;
    let alveolar_volume =
        VA_ALPHA * volume::mask_count(&mask_vent) as f64 * voxel_ml / FOV_INFLATION_SCALE_3D;

    let kco_est = KCO_ALPHA * membrane.mean / reference.fit_membrane.1
        + KCO_BETA * rbc.mean / reference.fit_rbc.1;
    let dlco_est = kco_est * alveolar_volume;

    info!(
        vent_defect_pct = vent.defect_pct,
        rbc_defect_pct = rbc.defect_pct,
        membrane_high_pct = membrane.high_pct,
        "biomarkers_computed"
    );

    Ok(Biomarkers {
        reference_key: reference.key,
        rbc_m_ratio: corrected.rbc_m_ratio,
        vent,
        rbc,
        membrane,
        inflation,
        alveolar_volume,
        kco_est,
        dlco_est,
    })
}

fn compartment_stats(
    image: &ScalarVolume,
    raw: &ScalarVolume,
    binned: &binning::BinVolume,
    stat_mask: &MaskVolume,
    bin_mask: &MaskVolume,
    high_bins: &[u8],
) -> CompartmentStats {
    let mut values = volume::masked_values(image, stat_mask);
    let mean = stats::mean(&values);
    let stddev = stats::std_dev(&values);
    let median = stats::median(&mut values);

    let signal = volume::masked_values(raw, stat_mask);
    let background: Vec<f64> = raw
        .iter()
        .zip(bin_mask.iter())
        .filter_map(|(&v, &m)| if m { None } else { Some(v) })
        .collect();

    CompartmentStats {
        defect_pct: binning::bin_percentage(binned, &[1], bin_mask),
        low_pct: binning::bin_percentage(binned, &[2], bin_mask),
        high_pct: binning::bin_percentage(binned, high_bins, bin_mask),
        mean,
        median,
        stddev,
        snr: stats::snr(&signal, &background),
    }
}

/// Normalize an image by its 99th percentile over the mask.
fn normalize_percentile(image: &ScalarVolume, mask: &MaskVolume) -> ScalarVolume {
    let mut values = volume::masked_values(image, mask);
    values.sort_unstable_by(f64::total_cmp);
    let p99 = stats::percentile_sorted(&values, 0.99);
    if p99 <= 0.0 {
        return image.clone();
    }
    image.mapv(|v| (v / p99).min(1.0))
}
