//! Healthy-cohort reference distributions.
//!
//! Cut points and histogram fits for the 218-ppm dissolved-phase
//! excitation protocol. Binning thresholds are in normalized signal
//! units (ventilation) or gas-normalized ratio units (RBC, membrane).

use serde::{Deserialize, Serialize};

use crate::config::ReferenceKey;

/// Gaussian histogram fit `(amplitude, mean, std)` of a healthy cohort.
pub type ReferenceFit = (f64, f64, f64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceCohort {
    pub key: ReferenceKey,
    /// 5 cuts -> 6 ventilation bins.
    pub threshold_vent: [f64; 5],
    /// 5 cuts -> 6 rbc2gas bins.
    pub threshold_rbc: [f64; 5],
    /// 7 cuts -> 8 membrane2gas bins.
    pub threshold_membrane: [f64; 7],
    pub fit_vent: ReferenceFit,
    pub fit_rbc: ReferenceFit,
    pub fit_membrane: ReferenceFit,
}

impl ReferenceCohort {
    pub fn for_key(key: ReferenceKey) -> Self {
        match key {
            ReferenceKey::Reference218Ppm | ReferenceKey::Manual => Self::reference_218_ppm(key),
        }
    }

    fn reference_218_ppm(key: ReferenceKey) -> Self {
        Self {
            key,
            threshold_vent: [0.185, 0.418, 0.647, 0.806, 0.933],
            threshold_rbc: [0.066e-2, 0.250e-2, 0.453e-2, 0.675e-2, 0.956e-2],
            threshold_membrane: [
                0.180e-2, 0.458e-2, 0.736e-2, 1.014e-2, 1.292e-2, 1.570e-2, 1.848e-2,
            ],
            fit_vent: (0.04074, 0.619, 0.196),
            fit_rbc: (0.06106, 0.471e-2, 0.259e-2),
            fit_membrane: (0.0700, 0.736e-2, 0.278e-2),
        }
    }
}
