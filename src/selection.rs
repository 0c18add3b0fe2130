use crate::dhus::DEFAULT_API_URL;
use crate::search::SearchRequest;
use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

pub const DEFAULT_START: &str = "20150523";

/// Parameters of one run: which tiles to fetch, the filters to apply and where to put them.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Selection {
    pub api_url: String,
    pub tiles: Vec<String>,
    pub level: String,
    pub start: String,
    pub end: String,
    pub max_cloud: f64,
    /// Minimum archive size in MB
    pub min_size: f64,
    pub output_dir: PathBuf,
    pub remove: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            tiles: vec![],
            level: "1C".to_string(),
            start: DEFAULT_START.to_string(),
            end: Utc::now().format("%Y%m%d").to_string(),
            max_cloud: 100.,
            min_size: 25.,
            output_dir: PathBuf::from("."),
            remove: false,
        }
    }
}

impl Selection {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let selection: Self = toml::from_str(&content)?;
        Ok(selection)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let selection: Self = toml::from_str(&table.to_string())?;
        Ok(selection)
    }

    pub fn search_request(self: &Self, tile: &str) -> SearchRequest {
        SearchRequest {
            tile: tile.to_string(),
            level: self.level.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            max_cloud: self.max_cloud,
            min_size_mb: self.min_size,
        }
    }

    pub fn tile_dir(self: &Self, tile: &str) -> PathBuf {
        self.output_dir.join(tile)
    }
}
