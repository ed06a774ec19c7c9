//! Subject run assembly.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::ctx::Ctx;
use crate::pipeline::{self, Pipeline};
use crate::registration::ExternalRegistration;
use crate::segmentation::ExternalCnnSegmenter;

/// Build a context with the external capabilities the config names.
pub fn build_ctx(config: Config) -> Ctx {
    let timeout = Duration::from_secs(config.capability_timeout_s);
    let mut ctx = Ctx::new(config);
    if !ctx.config.segmentation_cmd.is_empty() {
        ctx.segmenter = Some(Box::new(ExternalCnnSegmenter {
            cmd: ctx.config.segmentation_cmd.clone(),
            work_dir: ctx.output.staging_dir.clone(),
            timeout,
        }));
    }
    if !ctx.config.registration_cmd.is_empty() {
        ctx.registrar = Some(Box::new(ExternalRegistration {
            cmd: ctx.config.registration_cmd.clone(),
            work_dir: ctx.output.staging_dir.clone(),
            timeout,
        }));
    }
    ctx
}

/// Run one subject to completion, full or reprocess mode per config.
pub fn run_subject(config: Config) -> Result<Ctx> {
    let reprocess = config.force_reprocess;
    let mut ctx = build_ctx(config);
    let stages = if reprocess {
        info!(subject = %ctx.config.subject_id, "reprocess_mode");
        pipeline::reprocess_stages()
    } else {
        info!(subject = %ctx.config.subject_id, "full_mode");
        pipeline::full_stages()
    };
    Pipeline::new(stages).run(&mut ctx)?;
    Ok(ctx)
}
