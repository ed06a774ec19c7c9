use serde::{Deserialize, Serialize};

use crate::biomarkers::Biomarkers;
use crate::calibration::CalibrationSource;
use crate::config::{MaskMergeOp, ReferenceKey, SegmentationKey};

/// Calibration summary as it appears in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationInfo {
    pub rbc_m_ratio: f64,
    pub dissolved_phase: f64,
    pub noise_floor: f64,
    pub source: CalibrationSource,
}

/// Acquisition parameters echoed into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInfo {
    pub scan_date: String,
    /// Echo time, microseconds.
    pub te90_us: f64,
    /// Repetition time, milliseconds.
    pub tr_ms: f64,
    pub fa_gas: f64,
    pub fa_dis: f64,
    pub field_strength: f64,
    pub fov_mm: f64,
}

/// Map files written next to the report, relative paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFiles {
    pub gas: String,
    pub membrane: String,
    pub rbc: String,
    pub rbc2gas: String,
    pub membrane2gas: String,
    pub mask: String,
}

/// Report payload handed to the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GxReportV1 {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub subject_id: String,
    pub scan: ScanInfo,
    pub dual_acquisition: bool,
    pub mask_merge: Option<MaskMergeOp>,
    pub segmentation_key: SegmentationKey,
    pub reference_key: ReferenceKey,
    pub calibration: CalibrationInfo,
    pub biomarkers: Biomarkers,
    /// Caveats the renderer must surface (e.g. self-calibrated ratio).
    pub caveats: Vec<String>,
    pub maps: MapFiles,
}
