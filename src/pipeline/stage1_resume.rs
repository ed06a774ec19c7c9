use anyhow::{bail, Context, Result};
use tracing::info;

use crate::calibration;
use crate::ctx::Ctx;
use crate::decompose;
use crate::error::PipelineError;
use crate::io::artifact;
use crate::pipeline::{stage1_load, stage3_decompose, RunState, Stage};

/// Reprocess-mode entry: resume at `Decomposed` from a snapshot artifact
/// instead of re-running reconstruction and decomposition.
///
/// `force_calibration` re-resolves the calibration (and re-decomposes,
/// since the maps depend on it); `force_segmentation` drops any masks the
/// snapshot carried.
pub struct Stage1Resume;

impl Stage1Resume {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Resume {
    fn name(&self) -> &'static str {
        "resume"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let path = artifact::find_snapshot(
            &ctx.config.out_dir,
            &ctx.config.data_dir,
            &ctx.config.subject_id,
        )
        .ok_or_else(|| {
            PipelineError::Artifact(format!(
                "no snapshot for subject {} under {} or {}",
                ctx.config.subject_id,
                ctx.config.out_dir.display(),
                ctx.config.data_dir.display()
            ))
        })?;
        let snapshot = artifact::read_snapshot(&path)?;
        if snapshot.subject_id != ctx.config.subject_id {
            bail!(
                "snapshot subject {} does not match config subject {}",
                snapshot.subject_id,
                ctx.config.subject_id
            );
        }
        if snapshot.pairs.len() != snapshot.maps.len() || snapshot.pairs.is_empty() {
            return Err(PipelineError::Artifact(format!(
                "snapshot has {} pairs but {} map sets",
                snapshot.pairs.len(),
                snapshot.maps.len()
            ))
            .into());
        }
        info!(path = %path.display(), n_pairs = snapshot.pairs.len(), "snapshot_loaded");

        stage1_load::scaffold_staging(ctx)?;

        ctx.resumed = true;
        ctx.pairs = snapshot.pairs;
        ctx.proton = snapshot.proton;
        ctx.calibration_scan = snapshot.calibration_scan;

        if ctx.config.force_calibration {
            let primary = ctx.pairs.first().context("snapshot has no dixon pair")?;
            let cal = calibration::resolve(
                ctx.config.rbc_m_ratio,
                primary,
                ctx.calibration_scan.as_ref(),
            )?;
            info!(ratio = cal.rbc_m_ratio, source = ?cal.source, "calibration_rerun");
            let mut maps = Vec::with_capacity(ctx.pairs.len());
            for pair in &ctx.pairs {
                maps.push(decompose::decompose(pair, &cal)?);
            }
            ctx.calibration = Some(cal);
            ctx.maps = maps;
        } else {
            ctx.calibration = Some(snapshot.calibration);
            ctx.maps = snapshot.maps;
        }

        if !ctx.config.force_segmentation {
            if let Some(masks) = snapshot.masks {
                if masks.len() == ctx.pairs.len() {
                    ctx.masks = masks;
                    ctx.masks_from_snapshot = true;
                    info!("snapshot_masks_reused");
                }
            }
        }

        stage3_decompose::write_snapshot(ctx, ctx.masks_from_snapshot.then(|| ctx.masks.clone()))?;
        ctx.state = RunState::Decomposed;
        Ok(())
    }
}
