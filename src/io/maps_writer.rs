//! Biomarker map export.
//!
//! Maps are written as `.npy` volumes next to the report so downstream
//! viewers can load them without this tool.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray_npy::WriteNpyExt;

use crate::corrections::CorrectedMaps;
use crate::decompose::CompartmentMaps;
use crate::schema::v1::MapFiles;
use crate::volume::{MaskVolume, ScalarVolume};

pub fn write_maps(
    dir: &Path,
    maps: &CompartmentMaps,
    corrected: &CorrectedMaps,
    mask: &MaskVolume,
) -> Result<MapFiles> {
    let files = MapFiles {
        gas: "gas.npy".to_string(),
        membrane: "membrane.npy".to_string(),
        rbc: "rbc.npy".to_string(),
        rbc2gas: "rbc2gas.npy".to_string(),
        membrane2gas: "membrane2gas.npy".to_string(),
        mask: "mask.npy".to_string(),
    };
    write_scalar(&dir.join(&files.gas), &maps.gas)?;
    write_scalar(&dir.join(&files.membrane), &maps.membrane)?;
    write_scalar(&dir.join(&files.rbc), &maps.rbc)?;
    write_scalar(&dir.join(&files.rbc2gas), &corrected.rbc2gas)?;
    write_scalar(&dir.join(&files.membrane2gas), &corrected.membrane2gas)?;

    let mask_u8 = mask.mapv(|m| u8::from(m));
    let file = File::create(dir.join(&files.mask))
        .with_context(|| format!("failed to create mask in {}", dir.display()))?;
    mask_u8.write_npy(file).context("failed to write mask.npy")?;

    Ok(files)
}

fn write_scalar(path: &Path, volume: &ScalarVolume) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    volume
        .write_npy(file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
