//! Client for Copernicus Data Hub (DHuS) instances: OpenSearch for queries, OData for downloads
mod feed;
mod provider;
pub use provider::{Provider, DEFAULT_API_URL};

use crate::catalog::ProductQuery;

const PLATFORM_NAME: &str = "Sentinel-2";

/// Renders `query` in the OpenSearch syntax of the `/search` endpoint.
pub fn opensearch_query(query: &ProductQuery) -> String {
    [
        format!(
            "beginposition:[{} TO {}]",
            query.start.to_query(),
            query.end.to_query()
        ),
        format!("platformname:{PLATFORM_NAME}"),
        format!("producttype:{}", query.level.product_type()),
        format!("cloudcoverpercentage:[0 TO {}]", query.max_cloud),
        format!("filename:*T{}*", query.tile),
    ]
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductLevel, QueryDate};
    use chrono::NaiveDate;

    #[test]
    fn test_opensearch_query() {
        let query = ProductQuery {
            tile: "36KWA".to_string(),
            level: ProductLevel::L1C,
            start: NaiveDate::from_ymd_opt(2015, 5, 23).unwrap().into(),
            end: QueryDate::Expression("NOW".to_string()),
            max_cloud: 50.,
        };
        assert_eq!(
            opensearch_query(&query),
            "beginposition:[2015-05-23T00:00:00Z TO NOW] platformname:Sentinel-2 \
             producttype:S2MSI1C cloudcoverpercentage:[0 TO 50] filename:*T36KWA*"
        );
    }

    #[test]
    fn test_opensearch_query_open_window() {
        let query = ProductQuery {
            tile: "08VPH".to_string(),
            level: ProductLevel::L2A,
            start: QueryDate::Open,
            end: QueryDate::Open,
            max_cloud: 12.5,
        };
        assert_eq!(
            opensearch_query(&query),
            "beginposition:[* TO *] platformname:Sentinel-2 \
             producttype:S2MSI2A cloudcoverpercentage:[0 TO 12.5] filename:*T08VPH*"
        );
    }
}
