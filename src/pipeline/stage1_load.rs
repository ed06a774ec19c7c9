use anyhow::{bail, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::io::bundle;
use crate::pipeline::{RunState, Stage};

/// Full-mode entry: scaffold the staging directory and read the raw
/// acquisition bundle.
pub struct Stage1Load;

impl Stage1Load {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        scaffold_staging(ctx)?;

        let path = bundle::find_bundle(&ctx.config.data_dir)?;
        let input = bundle::read_bundle(&path)?;
        if input.subject_id != ctx.config.subject_id {
            bail!(
                "bundle subject {} does not match config subject {}",
                input.subject_id,
                ctx.config.subject_id
            );
        }
        if input.dixon.is_empty() || input.dixon.len() > 2 {
            bail!("expected 1 or 2 dixon scans, bundle has {}", input.dixon.len());
        }

        info!(
            bundle = %path.display(),
            n_dixon = input.dixon.len(),
            has_proton = input.proton.is_some(),
            has_calibration = input.calibration.is_some(),
            "subject_bundle_loaded"
        );
        ctx.input = Some(input);
        ctx.state = RunState::Loaded;
        Ok(())
    }
}

pub(crate) fn scaffold_staging(ctx: &Ctx) -> Result<()> {
    let staging = &ctx.output.staging_dir;
    if staging.exists() {
        std::fs::remove_dir_all(staging)?;
    }
    std::fs::create_dir_all(staging)?;
    info!(staging = %staging.display(), "staging_dir_ready");
    Ok(())
}
