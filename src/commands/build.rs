use std::path::Path;

use anyhow::bail;

use crate::{
    BuildArgs,
    build::{BuildReport, Builder, MetadataCache},
};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    if args.clean {
        clean(&args.source, &args.out)?;
    }

    let builder = Builder::setup(&args.source, args.out.clone())?;
    let report = builder.build(&mut MetadataCache::new()).await?;
    log_report(&report);

    Ok(())
}

/// Remove the output directory. A missing directory is not an error.
fn clean(source: &Path, out: &Path) -> Result<(), anyhow::Error> {
    if !out.exists() {
        return Ok(());
    }

    let source = source.canonicalize()?;
    let out = out.canonicalize()?;
    if source.starts_with(&out) {
        bail!(
            "refusing to clean {}: it contains the source directory",
            out.display()
        );
    }

    std::fs::remove_dir_all(&out)?;
    tracing::info!("deleted {}", out.display());
    Ok(())
}

/// Summarize a finished build. Failed posts are reported but don't fail
/// the command.
pub fn log_report(report: &BuildReport) {
    tracing::info!(
        "built site to {} ({} listed, {} written, {} up to date, {} static files)",
        report.output_dir.display(),
        report.listed,
        report.written,
        report.skipped,
        report.assets_copied
    );

    if !report.failed.is_empty() {
        tracing::warn!(
            "{} post(s) failed: {}",
            report.failed.len(),
            report.failed.join(", ")
        );
    }
}
