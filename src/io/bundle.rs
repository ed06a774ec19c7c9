//! Subject input bundle.
//!
//! The upstream reconstruction collaborator leaves one `.gxi` bundle per
//! subject in the data directory: gzipped bincode of the reconstructed
//! complex volumes plus acquisition metadata.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::acquisition::Acquisition;

pub const BUNDLE_EXTENSION: &str = "gxi";

/// One Dixon scan's acquisitions as they arrive from reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DixonInput {
    pub gas: Acquisition,
    pub dissolved: Acquisition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectInput {
    pub subject_id: String,
    /// One scan normally, two in the dual-acquisition case.
    pub dixon: Vec<DixonInput>,
    pub proton: Option<Acquisition>,
    pub calibration: Option<Acquisition>,
}

/// Locate the subject bundle in the data directory.
///
/// Exactly one `.gxi` file is expected; none or several is an input error.
pub fn find_bundle(data_dir: &Path) -> Result<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some(BUNDLE_EXTENSION) {
            found.push(path);
        }
    }
    match found.len() {
        0 => bail!("no .{BUNDLE_EXTENSION} bundle in {}", data_dir.display()),
        1 => Ok(found.remove(0)),
        n => bail!("{n} .{BUNDLE_EXTENSION} bundles in {}", data_dir.display()),
    }
}

pub fn read_bundle(path: &Path) -> Result<SubjectInput> {
    super::read_bincode_gz(path)
}

pub fn write_bundle(path: &Path, input: &SubjectInput) -> Result<()> {
    super::write_bincode_gz(path, input)
}
