pub mod quantify;

use serde::{Deserialize, Serialize};

use crate::config::ReferenceKey;

/// Defect/low/high percentages and summary statistics for one compartment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompartmentStats {
    pub defect_pct: f64,
    pub low_pct: f64,
    pub high_pct: f64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub snr: f64,
}

/// Subject-level biomarker summary, tagged with the reference cohort the
/// bin thresholds came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Biomarkers {
    pub reference_key: ReferenceKey,
    pub rbc_m_ratio: f64,
    pub vent: CompartmentStats,
    pub rbc: CompartmentStats,
    pub membrane: CompartmentStats,
    /// Thoracic-cavity volume at inflation, liters.
    pub inflation: f64,
    /// Estimated alveolar volume, liters.
    pub alveolar_volume: f64,
    pub kco_est: f64,
    pub dlco_est: f64,
}
