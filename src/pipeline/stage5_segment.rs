use anyhow::Result;
use tracing::info;

use crate::config::SegmentationKey;
use crate::ctx::Ctx;
use crate::error::PipelineError;
use crate::pipeline::{stage3_decompose, RunState, Stage};
use crate::segmentation;

/// Obtain a validated lung mask for every scan.
pub struct Stage5Segment;

impl Stage5Segment {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Segment {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        if ctx.masks_from_snapshot {
            info!(n_masks = ctx.masks.len(), "segmentation_reused_from_snapshot");
            ctx.state = RunState::Segmented;
            return Ok(());
        }

        if ctx.dual_acquisition() && ctx.config.segmentation_key == SegmentationKey::ManualVent {
            return Err(PipelineError::Segmentation(
                "manual_vent supports a single acquisition only".to_string(),
            )
            .into());
        }

        let mut masks = Vec::with_capacity(ctx.maps.len());
        for maps in &ctx.maps {
            let mask = segmentation::reconcile(
                ctx.config.segmentation_key,
                &maps.gas,
                ctx.config.manual_seg_filepath.as_deref(),
                ctx.segmenter.as_deref(),
            )?;
            masks.push(mask);
        }

        info!(n_masks = masks.len(), "segmentation_done");
        ctx.masks = masks;
        stage3_decompose::write_snapshot(ctx, Some(ctx.masks.clone()))?;
        ctx.state = RunState::Segmented;
        Ok(())
    }
}
