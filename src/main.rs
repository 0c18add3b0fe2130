use anyhow::{Context, Result};
use clap::Parser;
use s2_fetch::dhus::Provider;
use s2_fetch::harvest;
use s2_fetch::selection::Selection;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Download Sentinel-2 data from a Copernicus Data Hub, by tile, date range and cloud cover"
)]
struct Args {
    /// Data Hub username
    username: String,

    /// Data Hub password
    password: String,

    /// Tile name(s) to download, e.g. 36KWA
    #[arg(short, long, num_args = 1..)]
    tiles: Vec<String>,

    /// Download level '1C' or '2A' data [default: 1C]
    #[arg(short, long)]
    level: Option<String>,

    /// Start date for search, YYYYMMDD [default: 20150523]
    #[arg(short, long)]
    start: Option<String>,

    /// End date for search, YYYYMMDD [default: today]
    #[arg(short, long)]
    end: Option<String>,

    /// Maximum percentage of cloud cover to download [default: 100]
    #[arg(short = 'c', long)]
    maxcloud: Option<f64>,

    /// Minimum filesize to download in MB [default: 25]
    #[arg(short, long)]
    minsize: Option<f64>,

    /// Output directory [default: current directory]
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Delete .zip files after decompression is complete
    #[arg(short, long)]
    remove: bool,

    /// TOML file with default values for any of the options above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the Data Hub
    #[arg(long)]
    api_url: Option<String>,

    /// Write a JSON report of every download and extraction to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn selection(self: &Self) -> Result<Selection> {
        let mut selection = match &self.config {
            Some(path) => Selection::read(path)
                .with_context(|| format!("Unable to read config file {}", path.display()))?,
            None => Selection::default(),
        };

        if !self.tiles.is_empty() {
            selection.tiles = self.tiles.clone();
        }
        if let Some(level) = &self.level {
            selection.level = level.clone();
        }
        if let Some(start) = &self.start {
            selection.start = start.clone();
        }
        if let Some(end) = &self.end {
            selection.end = end.clone();
        }
        if let Some(maxcloud) = self.maxcloud {
            selection.max_cloud = maxcloud;
        }
        if let Some(minsize) = self.minsize {
            selection.min_size = minsize;
        }
        if let Some(output_dir) = &self.output_dir {
            selection.output_dir = output_dir.clone();
        }
        if let Some(api_url) = &self.api_url {
            selection.api_url = api_url.clone();
        }
        selection.remove |= self.remove;
        Ok(selection)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let selection = args.selection()?;

    let provider = Provider::connect(&args.username, &args.password, &selection.api_url).await?;

    let report = harvest::run(&provider, &selection).await?;
    if let Some(path) = &args.report {
        report.write(path)?;
        info!("Report written to {}", path.display());
    }

    info!("{} products extracted", report.extracted().len());
    let failures = report.download_failures();
    if failures > 0 {
        warn!("{} products failed to download, run again to retry", failures);
    }

    Ok(())
}
