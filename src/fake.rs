//! In-memory catalog used by the unit tests
use crate::catalog::{Catalog, Product, ProductQuery};
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn product(tile: &str, level: &str, index: usize, cloud_cover: f64, size: &str) -> Product {
    let title = format!(
        "S2A_MSIL{level}_20200101T07330{index}_N0208_R049_T{tile}_20200101T091234"
    );
    Product {
        uuid: format!("{tile}-{level}-{index}"),
        filename: format!("{title}.SAFE"),
        title,
        size: size.to_string(),
        cloud_cover,
        product_type: format!("S2MSI{level}"),
        tile_id: tile.to_string(),
    }
}

/// Writes a small but well formed product archive holding `<safe_name>/`.
pub fn write_product_zip(path: &Path, safe_name: &str) -> Result<()> {
    let mut writer = ZipWriter::new(File::create(path)?);
    writer.add_directory(format!("{safe_name}/"), SimpleFileOptions::default())?;
    writer.start_file(format!("{safe_name}/manifest.safe"), SimpleFileOptions::default())?;
    writer.write_all(b"<xfdu:XFDU/>")?;
    writer.start_file(
        format!("{safe_name}/GRANULE/MTD_TL.xml"),
        SimpleFileOptions::default(),
    )?;
    writer.write_all(b"<n1:Level-1C_Tile_ID/>")?;
    writer.finish()?;
    Ok(())
}

/// Behaves like a catalog server: applies the query's tile, level and cloud filters
/// and serves archives on download.
pub struct FakeCatalog {
    products: Vec<Product>,
    failing: HashSet<String>,
    corrupt: HashSet<String>,
    queries: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            failing: HashSet::new(),
            corrupt: HashSet::new(),
            queries: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Downloads of `title` fail with a transport error.
    pub fn failing(mut self, title: &str) -> Self {
        self.failing.insert(title.to_string());
        self
    }

    /// Downloads of `title` produce bytes that are not a zip archive.
    pub fn corrupt(mut self, title: &str) -> Self {
        self.corrupt.insert(title.to_string());
        self
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl Catalog for FakeCatalog {
    async fn query(self: &Self, query: &ProductQuery) -> Result<Vec<Product>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let products = self
            .products
            .iter()
            .filter(|p| p.tile_id == query.tile)
            .filter(|p| p.product_type == query.level.product_type())
            .filter(|p| p.cloud_cover <= query.max_cloud)
            .cloned()
            .collect();
        Ok(products)
    }

    async fn download(self: &Self, product: &Product, output_dir: &Path) -> Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&product.title) {
            bail!("Connection reset while downloading {}", product.title);
        }

        let dst = output_dir.join(product.archive_name());
        if self.corrupt.contains(&product.title) {
            fs::write(&dst, b"<html>Service Unavailable</html>")?;
        } else {
            write_product_zip(&dst, &product.extracted_name())?;
        }
        Ok(dst)
    }
}
