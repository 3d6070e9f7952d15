use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use packsync::logging;
use packsync::{
    Config, HttpDownloader, ManifestGenerator, ProgressCallback, ResourceSet, SyncSequencer,
    TransferProgress,
};

/// Keep a local pack directory in sync with its published manifest
#[derive(Parser, Debug)]
#[command(name = "packsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The directory containing the managed files
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Path to the config file
    #[arg(long)]
    config: PathBuf,

    /// Path to the local manifest
    #[arg(long)]
    resources: PathBuf,

    /// Regenerate the manifest from the local tree instead of syncing
    #[arg(long)]
    generate_metadata: bool,

    /// Append log output to this file
    #[arg(long, default_value = "packsync.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_file)
        .with_context(|| format!("failed to open log file {}", cli.log_file.display()))?;

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    info!("Config file: {}", cli.config.display());

    let (resources, created) = ResourceSet::load_or_init(&cli.resources, &config.name)
        .with_context(|| format!("failed to load manifest {}", cli.resources.display()))?;
    if created {
        warn!("Missing manifest! Created one at {}", cli.resources.display());
    }
    info!(
        "Resources file: {} (version {})",
        cli.resources.display(),
        resources.local_version
    );

    let bar = progress_bar();
    let progress = progress_callback(bar.clone());

    let outcome = if cli.generate_metadata {
        info!("Generating metadata for server...");
        ManifestGenerator::new(&cli.base_dir, config, resources, &cli.resources)
            .with_progress_callback(progress)
            .generate()
            .await
            .map(|report| {
                info!(
                    "Wrote version {} with {} resources",
                    report.manifest.local_version,
                    report.manifest.resources.len()
                );
            })
    } else {
        let mut sequencer = SyncSequencer::new(
            &cli.base_dir,
            config,
            &cli.config,
            &cli.resources,
            Arc::new(HttpDownloader::new()),
        )
        .with_progress_callback(progress);

        sequencer.run().await.map(|report| {
            info!(
                "Downloaded {} files, removed {} retired files",
                report.downloaded.len(),
                report.patches_removed.len()
            );
        })
    };

    bar.finish_and_clear();
    outcome.context("packsync run failed")?;
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |progress: &TransferProgress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.processed as u64);
        if !progress.is_finished() {
            bar.set_message(progress.file_name.clone());
        }
    })
}
