//! Lung mask acquisition and reconciliation.
//!
//! The mask comes from the CNN capability, a user-supplied nifti file, or
//! is skipped (all-ones). Mask geometry is validated against the image it
//! masks; a mismatch is an error, never coerced. In the dual-acquisition
//! case the per-scan masks combine under a configured operator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ndarray::Ix3;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use tracing::info;

use crate::capability;
use crate::config::{MaskMergeOp, SegmentationKey};
use crate::error::PipelineError;
use crate::volume::{self, MaskVolume, ScalarVolume};

/// Black-box segmentation model: anatomical image in, binary mask out.
pub trait SegmentationCapability {
    fn infer(&self, image: &ScalarVolume) -> Result<MaskVolume, PipelineError>;
}

/// CNN inference through an external command.
///
/// The command receives two extra arguments, the input and output `.npy`
/// paths; the output must hold a `u8` volume with nonzero foreground.
pub struct ExternalCnnSegmenter {
    pub cmd: Vec<String>,
    pub work_dir: PathBuf,
    pub timeout: Duration,
}

impl SegmentationCapability for ExternalCnnSegmenter {
    fn infer(&self, image: &ScalarVolume) -> Result<MaskVolume, PipelineError> {
        let input = self.work_dir.join("seg_input.npy");
        let output = self.work_dir.join("seg_output.npy");
        write_npy(&input, image)?;

        let mut cmd = self.cmd.clone();
        cmd.push(input.display().to_string());
        cmd.push(output.display().to_string());
        capability::run_tool(&cmd, self.timeout).map_err(PipelineError::Segmentation)?;

        let file = std::fs::File::open(&output).map_err(|e| {
            PipelineError::Segmentation(format!("missing segmentation output: {e}"))
        })?;
        let mask = ndarray::Array3::<u8>::read_npy(file).map_err(|e| {
            PipelineError::Segmentation(format!("malformed segmentation output: {e}"))
        })?;
        Ok(mask.mapv(|v| v != 0))
    }
}

/// Obtain and validate the lung mask for one scan.
pub fn reconcile(
    key: SegmentationKey,
    anatomical: &ScalarVolume,
    manual_mask: Option<&Path>,
    capability: Option<&dyn SegmentationCapability>,
) -> Result<MaskVolume, PipelineError> {
    let mask = match key {
        SegmentationKey::CnnVent => {
            let capability = capability.ok_or_else(|| {
                PipelineError::Segmentation("cnn capability unavailable".to_string())
            })?;
            info!("segmentation_cnn_inference");
            capability.infer(anatomical)?
        }
        SegmentationKey::ManualVent => {
            let path = manual_mask.ok_or_else(|| {
                PipelineError::Segmentation("manual mask path missing".to_string())
            })?;
            info!(path = %path.display(), "segmentation_manual_mask");
            read_mask_nifti(path)?
        }
        SegmentationKey::Skip => {
            info!("segmentation_skipped");
            MaskVolume::from_elem(anatomical.dim(), true)
        }
    };
    validate(&mask, anatomical)?;
    Ok(mask)
}

/// Combine two same-grid masks; commutative for either operator.
pub fn merge_masks(
    a: &MaskVolume,
    b: &MaskVolume,
    op: MaskMergeOp,
) -> Result<MaskVolume, PipelineError> {
    if !volume::same_grid(a, b) {
        return Err(PipelineError::Segmentation(format!(
            "mask merge grid mismatch: {:?} vs {:?}",
            a.dim(),
            b.dim()
        )));
    }
    let mut out = a.clone();
    ndarray::Zip::from(&mut out).and(b).for_each(|o, &v| {
        *o = match op {
            MaskMergeOp::Union => *o || v,
            MaskMergeOp::Intersection => *o && v,
        };
    });
    Ok(out)
}

fn validate(mask: &MaskVolume, anatomical: &ScalarVolume) -> Result<(), PipelineError> {
    if !volume::same_grid(mask, anatomical) {
        return Err(PipelineError::Segmentation(format!(
            "mask shape {:?} does not match image shape {:?}",
            mask.dim(),
            anatomical.dim()
        )));
    }
    if volume::mask_count(mask) == 0 {
        return Err(PipelineError::Segmentation("mask is empty".to_string()));
    }
    Ok(())
}

/// Read a manual segmentation mask from a nifti file.
///
/// Any voxel above 0.5 is foreground.
pub fn read_mask_nifti(path: &Path) -> Result<MaskVolume, PipelineError> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| PipelineError::Segmentation(format!("{}: {e}", path.display())))?;
    let data = obj
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| PipelineError::Segmentation(format!("{}: {e}", path.display())))?
        .into_dimensionality::<Ix3>()
        .map_err(|e| {
            PipelineError::Segmentation(format!("{}: not a 3-d volume: {e}", path.display()))
        })?;
    Ok(data.mapv(|v| v > 0.5))
}

fn write_npy(path: &Path, volume: &ScalarVolume) -> Result<(), PipelineError> {
    let file = std::fs::File::create(path)
        .map_err(|e| PipelineError::Segmentation(format!("{}: {e}", path.display())))?;
    volume
        .write_npy(file)
        .map_err(|e| PipelineError::Segmentation(format!("{}: {e}", path.display())))?;
    Ok(())
}
