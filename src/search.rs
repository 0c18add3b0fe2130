use crate::catalog::{Catalog, Product, ProductLevel, ProductQuery, QueryDate};
use crate::error::Error;
use crate::tile::validate_tile;
use anyhow::Result;
use tracing::{info, warn};

/// Everything needed to look up one tile, before validation.
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub tile: String,
    pub level: String,
    pub start: String,
    pub end: String,
    pub max_cloud: f64,
    pub min_size_mb: f64,
}

/// Validates `request` and turns it into a catalog query.
pub fn build_query(request: &SearchRequest) -> Result<ProductQuery> {
    if !validate_tile(&request.tile) {
        return Err(Error::validation(format!(
            "The tile name input ({}) does not match the format ##XXX (e.g. 36KWA).",
            request.tile
        ))
        .into());
    }
    let level: ProductLevel = request.level.parse()?;
    let start: QueryDate = request.start.parse()?;
    let end: QueryDate = request.end.parse()?;

    if !(0.0..=100.0).contains(&request.max_cloud) {
        return Err(Error::validation(format!(
            "Maximum cloud cover must be a percentage between 0 and 100, got {}",
            request.max_cloud
        ))
        .into());
    }
    if !request.min_size_mb.is_finite() {
        return Err(Error::validation("Minimum size must be a finite number of MB").into());
    }

    Ok(ProductQuery {
        tile: request.tile.clone(),
        level,
        start,
        end,
        max_cloud: request.max_cloud,
    })
}

/// Queries `catalog` for the scenes of one tile and drops those smaller than `min_size_mb`.
pub async fn search(catalog: &impl Catalog, request: &SearchRequest) -> Result<Vec<Product>> {
    let query = build_query(request)?;

    let products = catalog.query(&query).await?;
    if products.is_empty() {
        return Ok(products);
    }

    let products = filter_by_size(products, request.min_size_mb);
    info!(
        "Found {} matching images for tile: {}",
        products.len(),
        request.tile
    );
    Ok(products)
}

pub fn filter_by_size(products: Vec<Product>, min_size_mb: f64) -> Vec<Product> {
    products
        .into_iter()
        .filter(|product| match product.size_mb() {
            Some(size) => size >= min_size_mb,
            None => {
                warn!(
                    "Ignoring {}, unable to read its size from '{}'",
                    product.title, product.size
                );
                false
            }
        })
        .collect()
}

/// Converts a catalog size string such as `812.34 MB` into megabytes.
///
/// Decimal and binary suffixes share a multiplier (`KiB` counts as `KB`). Anything else,
/// including a missing suffix, is read as a byte count.
pub fn parse_size_mb(size: &str) -> Option<f64> {
    let size = size.trim();
    let split = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(size.len());
    let (number, suffix) = size.split_at(split);
    let value: f64 = number.parse().ok()?;
    let suffix = suffix.trim().to_lowercase();

    let size_mb = match suffix.as_str() {
        "kb" | "kib" => value / 1_000.,
        "mb" | "mib" => value,
        "gb" | "gib" => value * 1_000.,
        _ => value / 1_000_000.,
    };
    Some(size_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{product, FakeCatalog};

    fn request(tile: &str, level: &str) -> SearchRequest {
        SearchRequest {
            tile: tile.to_string(),
            level: level.to_string(),
            start: "20150523".to_string(),
            end: "NOW".to_string(),
            max_cloud: 100.,
            min_size_mb: 25.,
        }
    }

    fn validation_message(err: anyhow::Error) -> String {
        match err.downcast_ref::<Error>() {
            Some(Error::Validation(msg)) => msg.clone(),
            _ => panic!("Expected a validation error, got: {err}"),
        }
    }

    #[test]
    fn test_parse_size_mb() {
        assert_eq!(parse_size_mb("512 KB"), Some(0.512));
        assert_eq!(parse_size_mb("2 GB"), Some(2000.));
        assert_eq!(parse_size_mb("10 MB"), Some(10.));
        assert_eq!(parse_size_mb("5 XB"), Some(0.000005));
        assert_eq!(parse_size_mb("1.5 GiB"), Some(1500.));
        assert_eq!(parse_size_mb("300 kib"), Some(0.3));
        assert_eq!(parse_size_mb("2000000"), Some(2.));
        assert_eq!(parse_size_mb("512KB"), Some(0.512));
        assert_eq!(parse_size_mb(" 2GB "), Some(2000.));
        assert_eq!(parse_size_mb("1.5GiB"), Some(1500.));
        assert_eq!(parse_size_mb("many MB"), None);
        assert_eq!(parse_size_mb(""), None);
    }

    #[test]
    fn test_filter_by_size() {
        let products = vec![
            product("36KWA", "1C", 0, 10., "10 MB"),
            product("36KWA", "1C", 1, 10., "30 MB"),
            product("36KWA", "1C", 2, 10., "50 MB"),
            product("36KWA", "1C", 3, 10., "unknown"),
        ];
        let sizes = filter_by_size(products, 25.)
            .iter()
            .map(|p| p.size.clone())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec!["30 MB", "50 MB"]);
    }

    #[test]
    fn test_build_query() {
        let mut req = request("36KWA", "2A");
        req.max_cloud = 50.;
        let query = build_query(&req).unwrap();
        assert_eq!(query.tile, "36KWA");
        assert_eq!(query.level, ProductLevel::L2A);
        assert_eq!(query.start.to_query(), "2015-05-23T00:00:00Z");
        assert_eq!(query.end, QueryDate::Expression("NOW".to_string()));
        assert_eq!(query.max_cloud, 50.);
    }

    #[test]
    fn test_build_query_rejects_bad_input() {
        let msg = validation_message(build_query(&request("36kwa", "1C")).unwrap_err());
        assert!(msg.contains("36kwa"));

        let msg = validation_message(build_query(&request("36KWA", "3B")).unwrap_err());
        assert!(msg.contains("'1C' or '2A'"));

        let mut req = request("36KWA", "1C");
        req.max_cloud = 120.;
        validation_message(build_query(&req).unwrap_err());

        let mut req = request("36KWA", "1C");
        req.start = "yesterday".to_string();
        validation_message(build_query(&req).unwrap_err());
    }

    #[tokio::test]
    async fn test_search_filters_by_size() {
        let catalog = FakeCatalog::new(vec![
            product("36KWA", "1C", 0, 10., "10 MB"),
            product("36KWA", "1C", 1, 10., "30 MB"),
            product("36KWA", "1C", 2, 10., "50 MB"),
        ]);
        let products = search(&catalog, &request("36KWA", "1C")).await.unwrap();
        let sizes = products.iter().map(|p| p.size_mb().unwrap()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![30., 50.]);
    }

    #[tokio::test]
    async fn test_search_does_not_query_on_invalid_input() {
        let catalog = FakeCatalog::new(vec![product("36KWA", "1C", 0, 10., "30 MB")]);
        assert!(search(&catalog, &request("3KWA", "1C")).await.is_err());
        assert!(search(&catalog, &request("36KWA", "L1")).await.is_err());
        assert_eq!(catalog.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let catalog = FakeCatalog::new(vec![product("36KWA", "1C", 0, 10., "30 MB")]);
        let products = search(&catalog, &request("36KWB", "1C")).await.unwrap();
        assert!(products.is_empty());
        assert_eq!(catalog.query_calls(), 1);
    }
}
