use crate::catalog::Catalog;
use crate::decompress::{decompress, ExtractReport};
use crate::download::{download_products, DownloadReport};
use crate::error::Error;
use crate::search::search;
use crate::selection::Selection;
use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize, Debug)]
pub struct TileReport {
    pub tile: String,
    pub found: usize,
    pub downloads: DownloadReport,
    pub extractions: ExtractReport,
}

#[derive(Serialize, Debug, Default)]
pub struct RunReport {
    pub tiles: Vec<TileReport>,
}

impl RunReport {
    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Every product directory present after the run.
    pub fn extracted(self: &Self) -> Vec<PathBuf> {
        self.tiles
            .iter()
            .flat_map(|tile| tile.extractions.extracted())
            .collect()
    }

    pub fn download_failures(self: &Self) -> usize {
        self.tiles
            .iter()
            .map(|tile| tile.downloads.failures().len())
            .sum()
    }
}

/// Searches, downloads and extracts every tile of `selection` in turn.
pub async fn run(catalog: &impl Catalog, selection: &Selection) -> Result<RunReport> {
    if selection.tiles.is_empty() {
        return Err(Error::validation("No tiles selected").into());
    }

    let mut report = RunReport::default();
    for tile in &selection.tiles {
        let products = search(catalog, &selection.search_request(tile)).await?;
        if products.is_empty() {
            info!("No matching images for tile: {}", tile);
            continue;
        }

        let tile_dir = selection.tile_dir(tile);
        fs::create_dir_all(&tile_dir)?;

        let downloads = download_products(catalog, &products, &tile_dir).await?;
        let extractions = decompress(&downloads.archives(), &tile_dir, selection.remove)?;

        report.tiles.push(TileReport {
            tile: tile.clone(),
            found: products.len(),
            downloads,
            extractions,
        });
    }
    Ok(report)
}
