//! Types shared by every catalog backend, and the trait the pipeline drives them through.
use crate::error::Error;
use crate::search::parse_size_mb;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ARCHIVE_EXTENSION: &str = "zip";
pub const EXTRACTED_EXTENSION: &str = "SAFE";

/// One scene as reported by a catalog query.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub uuid: String,
    pub title: String,
    pub filename: String,
    /// Human readable size as reported by the catalog, e.g. `812.34 MB`
    pub size: String,
    pub cloud_cover: f64,
    pub product_type: String,
    pub tile_id: String,
}

impl Product {
    pub fn size_mb(&self) -> Option<f64> {
        parse_size_mb(&self.size)
    }

    pub fn archive_name(&self) -> String {
        format!("{}.{}", self.title, ARCHIVE_EXTENSION)
    }

    pub fn extracted_name(&self) -> String {
        if self.filename.ends_with(EXTRACTED_EXTENSION) {
            self.filename.clone()
        } else {
            format!("{}.{}", self.title, EXTRACTED_EXTENSION)
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductLevel {
    #[serde(rename = "1C")]
    L1C,
    #[serde(rename = "2A")]
    L2A,
}

impl ProductLevel {
    pub fn product_type(self: &Self) -> &'static str {
        match self {
            Self::L1C => "S2MSI1C",
            Self::L2A => "S2MSI2A",
        }
    }
}

impl FromStr for ProductLevel {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1C" => Ok(Self::L1C),
            "2A" => Ok(Self::L2A),
            other => Err(Error::validation(format!(
                "Level must be '1C' or '2A', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ProductLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1C => write!(f, "1C"),
            Self::L2A => write!(f, "2A"),
        }
    }
}

/// A bound of the acquisition window.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryDate {
    Open,
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// Date math understood by the catalog, e.g. `NOW-14DAYS`
    Expression(String),
}

impl QueryDate {
    pub fn to_query(self: &Self) -> String {
        match self {
            Self::Open => "*".to_string(),
            Self::Date(date) => date.format("%Y-%m-%dT00:00:00Z").to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

impl From<NaiveDate> for QueryDate {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl FromStr for QueryDate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::Open);
        }
        if s.starts_with("NOW") {
            return Ok(Self::Expression(s.to_string()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Ok(Self::Date(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::Date(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Timestamp(ts.with_timezone(&Utc)));
        }
        Err(Error::validation(format!(
            "Unable to interpret '{s}' as a date. Use YYYYMMDD, YYYY-MM-DD, an RFC 3339 timestamp, NOW-based date math or '*'"
        )))
    }
}

/// A validated query, scoped to a single tile and processing level.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuery {
    pub tile: String,
    pub level: ProductLevel,
    pub start: QueryDate,
    pub end: QueryDate,
    pub max_cloud: f64,
}

pub trait Catalog {
    /// Returns every product matching `query`.
    async fn query(self: &Self, query: &ProductQuery) -> Result<Vec<Product>>;

    /// Writes `product` to `<output_dir>/<title>.zip` and returns that path.
    async fn download(self: &Self, product: &Product, output_dir: &Path) -> Result<PathBuf>;
}
