use crate::catalog::{Catalog, Product};
use crate::error::Error;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded { path: PathBuf },
    AlreadyDownloaded { path: PathBuf },
    AlreadyExtracted { path: PathBuf },
    Failed { reason: String },
}

#[derive(Serialize, Clone, Debug)]
pub struct DownloadOutcome {
    pub title: String,
    #[serde(flatten)]
    pub status: DownloadStatus,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    /// Archives on disk after the pass, newly downloaded or not.
    pub fn archives(self: &Self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                DownloadStatus::Downloaded { path } | DownloadStatus::AlreadyDownloaded { path } => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn failures(self: &Self) -> Vec<&DownloadOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, DownloadStatus::Failed { .. }))
            .collect()
    }
}

/// Downloads every product not already present in `output_dir`, either as an archive or
/// extracted. A failed product is recorded and the batch carries on.
pub async fn download_products(
    catalog: &impl Catalog,
    products: &[Product],
    output_dir: &Path,
) -> Result<DownloadReport> {
    if !output_dir.is_dir() {
        return Err(Error::validation(format!(
            "Output directory {} doesn't exist.",
            output_dir.display()
        ))
        .into());
    }
    if products.is_empty() {
        return Err(Error::NoProducts(output_dir.display().to_string()).into());
    }

    let mut report = DownloadReport::default();
    for product in products {
        let status = try_download(catalog, product, output_dir).await;
        report.outcomes.push(DownloadOutcome {
            title: product.title.clone(),
            status,
        });
    }
    Ok(report)
}

async fn try_download(
    catalog: &impl Catalog,
    product: &Product,
    output_dir: &Path,
) -> DownloadStatus {
    let archive = output_dir.join(product.archive_name());
    if archive.exists() {
        info!(
            "Skipping {}, already downloaded in {}",
            product.title,
            output_dir.display()
        );
        return DownloadStatus::AlreadyDownloaded { path: archive };
    }

    let extracted = output_dir.join(product.extracted_name());
    if extracted.exists() {
        info!(
            "Skipping {}, already downloaded and extracted in {}",
            product.title,
            output_dir.display()
        );
        return DownloadStatus::AlreadyExtracted { path: extracted };
    }

    info!("Downloading {}...", product.title);
    match catalog.download(product, output_dir).await {
        Ok(path) => DownloadStatus::Downloaded { path },
        Err(e) => {
            warn!("Failed to download {}: {:#}", product.title, e);
            DownloadStatus::Failed {
                reason: format!("{e:#}"),
            }
        }
    }
}
