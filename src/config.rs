//! Subject run configuration.
//!
//! A config file is a JSON object of overrides on top of the defaults
//! below; the schema is fixed and unknown keys are rejected at load.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationKey {
    CnnVent,
    ManualVent,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKey {
    Proton2Gas,
    Manual,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HbCorrectionKey {
    None,
    RbcOnly,
    RbcAndMembrane,
}

/// How per-scan lung masks combine in the dual-acquisition case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMergeOp {
    Union,
    Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKey {
    Reference218Ppm,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub subject_id: String,
    pub out_dir: PathBuf,
    /// Explicit RBC:M ratio; overrides every derived source when set.
    pub rbc_m_ratio: Option<f64>,
    pub segmentation_key: SegmentationKey,
    /// Required iff `segmentation_key` is `manual_vent`.
    pub manual_seg_filepath: Option<PathBuf>,
    pub registration_key: RegistrationKey,
    /// Required iff `registration_key` is `manual`.
    pub manual_reg_filepath: Option<PathBuf>,
    pub hb_correction_key: HbCorrectionKey,
    /// Subject hemoglobin, g/dL; used only with a non-none correction key.
    pub hb: f64,
    pub mask_merge: MaskMergeOp,
    pub reference_key: ReferenceKey,
    /// Resume from the snapshot artifact instead of raw acquisitions.
    pub force_reprocess: bool,
    /// Re-run segmentation (and everything after it) in reprocess mode.
    pub force_segmentation: bool,
    /// Re-resolve calibration in reprocess mode instead of reusing the
    /// snapshot's result.
    pub force_calibration: bool,
    /// Command line for the segmentation capability; empty means the
    /// capability is unavailable.
    pub segmentation_cmd: Vec<String>,
    /// Command line for the registration capability; empty means the
    /// capability is unavailable.
    pub registration_cmd: Vec<String>,
    /// Timeout for external capability calls, seconds.
    pub capability_timeout_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            subject_id: String::new(),
            out_dir: PathBuf::from("out"),
            rbc_m_ratio: None,
            segmentation_key: SegmentationKey::CnnVent,
            manual_seg_filepath: None,
            registration_key: RegistrationKey::Skip,
            manual_reg_filepath: None,
            hb_correction_key: HbCorrectionKey::None,
            hb: 0.0,
            mask_merge: MaskMergeOp::Union,
            reference_key: ReferenceKey::Reference218Ppm,
            force_reprocess: false,
            force_segmentation: false,
            force_calibration: false,
            segmentation_cmd: Vec::new(),
            registration_cmd: Vec::new(),
            capability_timeout_s: 300,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subject_id.is_empty() {
            return Err(PipelineError::Config("subject_id is empty".to_string()).into());
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("data_dir is empty".to_string()).into());
        }
        if let Some(ratio) = self.rbc_m_ratio {
            if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
                return Err(PipelineError::Config(format!(
                    "rbc_m_ratio {ratio} outside (0, 1]"
                ))
                .into());
            }
        }
        if self.segmentation_key == SegmentationKey::ManualVent
            && self.manual_seg_filepath.is_none()
        {
            return Err(PipelineError::Config(
                "manual_seg_filepath required for segmentation_key = manual_vent".to_string(),
            )
            .into());
        }
        if self.registration_key == RegistrationKey::Manual && self.manual_reg_filepath.is_none() {
            return Err(PipelineError::Config(
                "manual_reg_filepath required for registration_key = manual".to_string(),
            )
            .into());
        }
        if self.hb_correction_key != HbCorrectionKey::None && self.hb <= 0.0 {
            return Err(PipelineError::Config(format!(
                "hb {} invalid for hb_correction_key {:?}",
                self.hb, self.hb_correction_key
            ))
            .into());
        }
        Ok(())
    }
}
