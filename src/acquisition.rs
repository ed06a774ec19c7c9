//! Acquisition data model.
//!
//! Volumes arrive already reconstructed: gridding raw k-space into complex
//! image space is an upstream collaborator. Everything here is immutable
//! once constructed.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::volume::{self, ComplexVolume, Shape3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcqRole {
    ProtonUte,
    Dixon,
    Calibration,
}

/// Scan metadata needed by the signal model and the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcqMeta {
    /// Echo time of the 90-degree dissolved sample, seconds.
    pub te90: f64,
    /// Repetition time, seconds.
    pub tr: f64,
    /// Gas-phase excitation flip angle, degrees.
    pub fa_gas: f64,
    /// Dissolved-phase excitation flip angle, degrees.
    pub fa_dis: f64,
    /// Main field strength, tesla.
    pub field_strength: f64,
    /// Field of view, mm.
    pub fov: f64,
    pub scan_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub role: AcqRole,
    pub meta: AcqMeta,
    pub volume: ComplexVolume,
}

/// Gas + dissolved complex volumes from one Dixon excitation train.
///
/// Both volumes share one voxel grid; the constructor rejects anything
/// else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DixonPair {
    pub gas: ComplexVolume,
    pub dissolved: ComplexVolume,
    pub meta: AcqMeta,
}

impl DixonPair {
    pub fn new(
        gas: ComplexVolume,
        dissolved: ComplexVolume,
        meta: AcqMeta,
    ) -> Result<Self, PipelineError> {
        if !volume::same_grid(&gas, &dissolved) {
            return Err(PipelineError::Decomposition(format!(
                "dixon pair grid mismatch: gas {:?} vs dissolved {:?}",
                gas.dim(),
                dissolved.dim()
            )));
        }
        Ok(Self { gas, dissolved, meta })
    }

    pub fn shape(&self) -> Shape3 {
        self.gas.dim()
    }
}
