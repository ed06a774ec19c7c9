use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod artifact;
pub mod bundle;
pub mod maps_writer;
pub mod report_writer;

/// Serialize a value as gzipped bincode.
pub(crate) fn write_bincode_gz<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    bincode::serialize_into(&mut encoder, value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    encoder
        .finish()
        .with_context(|| format!("failed to finish {}", path.display()))?;
    Ok(())
}

pub(crate) fn read_bincode_gz<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    bincode::deserialize_from(decoder)
        .with_context(|| format!("failed to deserialize {}", path.display()))
}

/// Pretty-printed JSON writer used for the report payload.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
