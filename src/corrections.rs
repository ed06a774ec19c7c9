//! Gas-normalized dissolved maps with decay and hemoglobin corrections.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::acquisition::AcqMeta;
use crate::config::HbCorrectionKey;
use crate::decompose::CompartmentMaps;
use crate::error::PipelineError;
use crate::signal;
use crate::volume::ScalarVolume;

/// Dissolved-phase maps normalized by the gas image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedMaps {
    pub rbc2gas: ScalarVolume,
    pub membrane2gas: ScalarVolume,
    /// RBC:M ratio after hemoglobin rescaling.
    pub rbc_m_ratio: f64,
    pub rbc_hb_factor: f64,
    pub membrane_hb_factor: f64,
}

/// Normalize the membrane/RBC maps by the gas image and apply T2* and
/// hemoglobin corrections.
///
/// Division is restricted to voxels with gas signal; everything else is 0.
pub fn correct(
    maps: &CompartmentMaps,
    meta: &AcqMeta,
    rbc_m_ratio: f64,
    hb_key: HbCorrectionKey,
    hb: f64,
) -> Result<CorrectedMaps, PipelineError> {
    if (meta.field_strength - 3.0).abs() > 0.5 {
        warn!(
            field_strength = meta.field_strength,
            "t2star constants are for 3T, correction may be inaccurate"
        );
    }
    let t2_rbc = signal::t2star_correction(meta.te90, signal::T2STAR_RBC_3T);
    let t2_membrane = signal::t2star_correction(meta.te90, signal::T2STAR_MEMBRANE_3T);

    let (rbc_hb_factor, membrane_hb_factor) = match hb_key {
        HbCorrectionKey::None => (1.0, 1.0),
        key => {
            if hb <= 0.0 {
                return Err(PipelineError::Calibration(format!(
                    "invalid hemoglobin value {hb} for correction {key:?}"
                )));
            }
            let (rbc, membrane) = signal::hb_correction(hb);
            match key {
                HbCorrectionKey::RbcOnly => {
                    info!(hb, "hb_correction_rbc_only");
                    (rbc, 1.0)
                }
                HbCorrectionKey::RbcAndMembrane => {
                    info!(hb, "hb_correction_rbc_and_membrane");
                    (rbc, membrane)
                }
                HbCorrectionKey::None => unreachable!(),
            }
        }
    };

    let mut rbc2gas = ScalarVolume::zeros(maps.shape());
    let mut membrane2gas = ScalarVolume::zeros(maps.shape());
    ndarray::Zip::from(&mut rbc2gas)
        .and(&mut membrane2gas)
        .and(&maps.gas)
        .and(&maps.rbc)
        .and(&maps.membrane)
        .for_each(|r2g, m2g, &g, &r, &m| {
            if g > 0.0 {
                *r2g = t2_rbc * rbc_hb_factor * r / g;
                *m2g = t2_membrane * membrane_hb_factor * m / g;
            }
        });

    Ok(CorrectedMaps {
        rbc2gas,
        membrane2gas,
        rbc_m_ratio: rbc_m_ratio * rbc_hb_factor / membrane_hb_factor,
        rbc_hb_factor,
        membrane_hb_factor,
    })
}
