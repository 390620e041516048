mod cli;
mod error;
mod logging;
mod progress;

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::progress::BatchProgressHandler;
use clap::Parser;
use e3fp::core::io::xyz::XyzLoader;
use e3fp::core::models::fingerprint::RepresentationKind;
use e3fp::engine::config::FingerprintingConfig;
use e3fp::engine::radial::RadialFingerprinterFactory;
use e3fp::workflows::batch::{self, FileOutcome, Parallelism};
use e3fp::workflows::generate::GenerateOptions;
use e3fp::workflows::progress::ProgressReporter;
use tracing::{debug, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {e}");
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("E3FP CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!("Setting worker pool to {} threads.", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {e}"))
            })?;
    }

    let config = FingerprintingConfig::builder()
        .max_level(cli.max_level)
        .shell_radius(cli.shell_radius)
        .kind(if cli.counts {
            RepresentationKind::Counts
        } else {
            RepresentationKind::Bits
        })
        .stereo(cli.stereo)
        .include_disconnected(!cli.exclude_disconnected)
        .retain_substructures(cli.substructures)
        .build()?;

    let options = GenerateOptions {
        out_dir_base: cli.out_dir_base.clone(),
        format: cli.format.into(),
        first: cli.first,
        overwrite: cli.overwrite,
        save: true,
    };

    log_run_parameters(&cli, &config, &options);

    let parallelism = if cli.sequential {
        Parallelism::Sequential
    } else {
        Parallelism::Parallel
    };

    let handler = BatchProgressHandler::new();
    let reporter = ProgressReporter::with_callback(handler.callback());

    let reports = batch::run(
        &cli.inputs,
        &config,
        &options,
        &XyzLoader,
        &RadialFingerprinterFactory,
        parallelism,
        &reporter,
    )
    .map_err(|e| CliError::Argument(format!("Could not resolve inputs: {e}")))?;

    let mut generated = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for report in &reports {
        match &report.outcome {
            FileOutcome::Generated { .. } => generated += 1,
            FileOutcome::AlreadyComplete { .. } => skipped += 1,
            FileOutcome::LoadFailed(_) | FileOutcome::GenerationFailed(_) => failed += 1,
        }
    }

    println!(
        "Finished: {generated} generated, {skipped} already complete, {failed} failed (of {} file(s)).",
        reports.len()
    );
    if failed > 0 {
        // Per-file failures are not fatal to the batch; re-running the batch
        // retries them cheaply thanks to the completeness cache.
        println!("⚠ {failed} file(s) failed; see the log for details.");
    }

    Ok(())
}

fn log_run_parameters(cli: &Cli, config: &FingerprintingConfig, options: &GenerateOptions) {
    info!("Input path count: {}", cli.inputs.len());
    info!("Out directory basename: {}", options.out_dir_base.display());
    info!("Output format: {:?}", options.format);
    match options.first {
        Some(first) => info!("Max first conformers: {first}"),
        None => info!("Max first conformers: all"),
    }
    match config.max_level {
        Some(max) => info!("Max iteration level: {max}"),
        None => info!("Max iteration level: run to termination"),
    }
    info!("Shell radius increment: {:.4}", config.shell_radius);
    info!("Representation: {:?}", config.kind);
    info!("Stereo mode: {}", config.stereo);
    info!("Include disconnected atoms: {}", config.include_disconnected);
    info!("Overwrite existing: {}", options.overwrite);
}
