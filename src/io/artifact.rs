//! Snapshot artifact for reprocess mode.
//!
//! Captures the pipeline at the `Decomposed` boundary: acquisitions,
//! calibration, and decomposed maps. Masks are added once segmentation
//! has run so a reprocess can also skip it unless forced. The snapshot
//! is written into the staging directory and finalized with the rest of
//! the outputs, so a failed run never leaves one behind.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::acquisition::DixonPair;
use crate::calibration::CalibrationResult;
use crate::decompose::CompartmentMaps;
use crate::volume::{ComplexVolume, MaskVolume};

pub const SNAPSHOT_EXTENSION: &str = "gxsnap";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub subject_id: String,
    pub pairs: Vec<DixonPair>,
    pub proton: Option<ComplexVolume>,
    pub calibration_scan: Option<crate::acquisition::Acquisition>,
    pub calibration: CalibrationResult,
    pub maps: Vec<CompartmentMaps>,
    /// Per-scan lung masks; present once segmentation has run.
    pub masks: Option<Vec<MaskVolume>>,
}

pub fn snapshot_filename(subject_id: &str) -> String {
    format!("{subject_id}.{SNAPSHOT_EXTENSION}")
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    super::write_bincode_gz(path, snapshot)
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    super::read_bincode_gz(path)
}

/// Find a previously finalized snapshot for the subject.
///
/// The finalized output directory is checked first, then the data
/// directory (for snapshots copied next to the raw files).
pub fn find_snapshot(out_dir: &Path, data_dir: &Path, subject_id: &str) -> Option<PathBuf> {
    let name = snapshot_filename(subject_id);
    let candidates = [out_dir.join(subject_id).join(&name), data_dir.join(&name)];
    candidates.into_iter().find(|c| c.is_file())
}
