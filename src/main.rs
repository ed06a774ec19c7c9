use anyhow::{bail, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use xe_gasmap::cli::{Cli, Commands};
use xe_gasmap::config::Config;
use xe_gasmap::pipeline::RunState;
use xe_gasmap::runner;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            let mut config = Config::load(&args.config)?;
            config.force_reprocess |= args.force_reprocess;
            config.force_segmentation |= args.force_segmentation;
            config.force_calibration |= args.force_calibration;

            let ctx = runner::run_subject(config)?;
            print_summary(&ctx);
        }
        Commands::Batch(args) => {
            if args.config.is_empty() {
                bail!("batch requires at least one --config");
            }
            // Subjects are independent; each run owns its volumes.
            let failures: Vec<String> = args
                .config
                .par_iter()
                .filter_map(|path| {
                    let result = Config::load(path).and_then(runner::run_subject);
                    match result {
                        Ok(ctx) => {
                            tracing::info!(subject = %ctx.config.subject_id, "subject_done");
                            None
                        }
                        Err(err) => Some(format!("{}: {err:#}", path.display())),
                    }
                })
                .collect();
            if !failures.is_empty() {
                for failure in &failures {
                    tracing::error!(failure = %failure, "subject_failed");
                }
                bail!("{} of {} subjects failed", failures.len(), args.config.len());
            }
        }
        Commands::Validate(args) => {
            let config = Config::load(&args.config)?;
            println!("config ok: subject {}", config.subject_id);
        }
    }

    Ok(())
}

fn print_summary(ctx: &xe_gasmap::ctx::Ctx) {
    if ctx.state != RunState::Reported {
        return;
    }
    let Some(b) = &ctx.biomarkers else { return };
    println!("subject {}: report written to {}", ctx.config.subject_id, ctx.output.final_dir.display());
    println!("rbc:m ratio      {:.3}", b.rbc_m_ratio);
    println!("vent defect pct  {:.1}", b.vent.defect_pct);
    println!("rbc defect pct   {:.1}", b.rbc.defect_pct);
    println!("membrane high pct {:.1}", b.membrane.high_pct);
    if let Some(report) = &ctx.report {
        for caveat in &report.caveats {
            println!("caveat: {caveat}");
        }
    }
}
