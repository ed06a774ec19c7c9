//! Spatial registration through an external tool.
//!
//! The tool is opaque: it maps a moving and a fixed image to an affine
//! transform file. Failures surface immediately; whether the run survives
//! them is the orchestrator's call (single-scan: proceed unregistered;
//! dual-scan: abort).

use std::path::{Path, PathBuf};
use std::time::Duration;

use ndarray_npy::WriteNpyExt;
use serde::Deserialize;
use tracing::info;

use crate::capability;
use crate::error::PipelineError;
use crate::volume::{self, Affine3, MaskVolume, ScalarVolume, Shape3};

/// Affine result of a registration, in the pull-back convention of
/// [`Affine3`].
#[derive(Debug, Clone, Copy)]
pub struct RegistrationTransform {
    pub affine: Affine3,
}

impl RegistrationTransform {
    pub fn identity() -> Self {
        Self { affine: Affine3::identity() }
    }

    /// Resample a scalar map onto the fixed grid (trilinear).
    pub fn apply_to_map(&self, map: &ScalarVolume, out_shape: Shape3) -> ScalarVolume {
        volume::resample_trilinear(map, &self.affine, out_shape)
    }

    /// Resample a mask onto the fixed grid (nearest-neighbor).
    pub fn apply_to_mask(&self, mask: &MaskVolume, out_shape: Shape3) -> MaskVolume {
        volume::resample_nearest(mask, &self.affine, out_shape)
    }
}

/// Black-box registration: moving + fixed image in, transform out.
pub trait RegistrationCapability {
    fn register(
        &self,
        moving: &ScalarVolume,
        fixed: &ScalarVolume,
    ) -> Result<RegistrationTransform, PipelineError>;
}

/// On-disk transform file: 16 row-major affine entries.
#[derive(Debug, Deserialize)]
struct TransformFile {
    affine: Vec<f64>,
}

/// ANTs-style registration through an external command.
///
/// The command receives three extra arguments: moving `.npy`, fixed
/// `.npy`, and the transform output path (JSON). Non-zero exit, timeout,
/// or a malformed transform file are registration errors; no retries.
pub struct ExternalRegistration {
    pub cmd: Vec<String>,
    pub work_dir: PathBuf,
    pub timeout: Duration,
}

impl RegistrationCapability for ExternalRegistration {
    fn register(
        &self,
        moving: &ScalarVolume,
        fixed: &ScalarVolume,
    ) -> Result<RegistrationTransform, PipelineError> {
        let moving_path = self.work_dir.join("reg_moving.npy");
        let fixed_path = self.work_dir.join("reg_fixed.npy");
        let transform_path = self.work_dir.join("reg_transform.json");
        write_npy(&moving_path, moving)?;
        write_npy(&fixed_path, fixed)?;

        let mut cmd = self.cmd.clone();
        cmd.push(moving_path.display().to_string());
        cmd.push(fixed_path.display().to_string());
        cmd.push(transform_path.display().to_string());
        capability::run_tool(&cmd, self.timeout).map_err(PipelineError::Registration)?;

        let transform = read_transform(&transform_path)?;
        info!("registration_transform_ready");
        Ok(transform)
    }
}

fn read_transform(path: &Path) -> Result<RegistrationTransform, PipelineError> {
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Registration(format!("missing transform file {}: {e}", path.display()))
    })?;
    let parsed: TransformFile = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| {
            PipelineError::Registration(format!("malformed transform {}: {e}", path.display()))
        })?;
    if parsed.affine.len() != 16 {
        return Err(PipelineError::Registration(format!(
            "transform {} has {} entries, expected 16",
            path.display(),
            parsed.affine.len()
        )));
    }
    let mut matrix = [[0.0; 4]; 4];
    for (i, row) in matrix.iter_mut().enumerate() {
        row.copy_from_slice(&parsed.affine[i * 4..i * 4 + 4]);
    }
    Ok(RegistrationTransform { affine: Affine3 { matrix } })
}

fn write_npy(path: &Path, volume: &ScalarVolume) -> Result<(), PipelineError> {
    let file = std::fs::File::create(path)
        .map_err(|e| PipelineError::Registration(format!("{}: {e}", path.display())))?;
    volume
        .write_npy(file)
        .map_err(|e| PipelineError::Registration(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Read a pre-registered scalar image from a nifti file.
pub fn read_scalar_nifti(path: &Path) -> Result<ScalarVolume, PipelineError> {
    use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| PipelineError::Registration(format!("{}: {e}", path.display())))?;
    obj.into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| PipelineError::Registration(format!("{}: {e}", path.display())))?
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|e| {
            PipelineError::Registration(format!("{}: not a 3-d volume: {e}", path.display()))
        })
}
