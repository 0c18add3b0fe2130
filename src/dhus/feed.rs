use crate::catalog::{Product, EXTRACTED_EXTENSION};
use crate::tile::tile_from_title;
use anyhow::{anyhow, Result};
use serde::Deserialize;

/// DHuS collapses single element lists into a bare object.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(vec![])
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    feed: Feed,
}

#[derive(Deserialize, Debug)]
pub struct Feed {
    #[serde(rename = "opensearch:totalResults")]
    total_results: String,
    #[serde(default)]
    entry: OneOrMany<Entry>,
}

impl Feed {
    pub fn parse(content: &str) -> Result<Self> {
        let response: SearchResponse = serde_json::from_str(content)?;
        Ok(response.feed)
    }

    pub fn total_results(self: &Self) -> Result<usize> {
        self.total_results
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid totalResults value: '{}'", self.total_results))
    }

    pub fn entries(self) -> Vec<Entry> {
        self.entry.into_vec()
    }
}

#[derive(Deserialize, Debug)]
struct Attribute {
    name: String,
    content: String,
}

#[derive(Deserialize, Debug)]
pub struct Entry {
    id: String,
    title: String,
    #[serde(default, rename = "str")]
    strings: OneOrMany<Attribute>,
    #[serde(default)]
    double: OneOrMany<Attribute>,
}

impl Entry {
    pub fn title(self: &Self) -> &str {
        &self.title
    }

    fn string(self: &Self, name: &str) -> Option<&str> {
        find(&self.strings, name)
    }

    fn double(self: &Self, name: &str) -> Option<f64> {
        find(&self.double, name)?.trim().parse().ok()
    }

    pub fn into_product(self: Self) -> Result<Product> {
        let missing = |field: &str| anyhow!("Entry {} has no '{}' attribute", self.title, field);

        let size = self.string("size").ok_or_else(|| missing("size"))?.to_string();
        let product_type = self
            .string("producttype")
            .ok_or_else(|| missing("producttype"))?
            .to_string();
        let cloud_cover = self
            .double("cloudcoverpercentage")
            .ok_or_else(|| missing("cloudcoverpercentage"))?;
        // Older L1C products predate the tileid attribute
        let tile_id = self
            .string("tileid")
            .or_else(|| tile_from_title(&self.title))
            .ok_or_else(|| missing("tileid"))?
            .to_string();
        let filename = self
            .string("filename")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.{}", self.title, EXTRACTED_EXTENSION));

        Ok(Product {
            uuid: self.id,
            title: self.title,
            filename,
            size,
            cloud_cover,
            product_type,
            tile_id,
        })
    }
}

fn find<'a>(attributes: &'a OneOrMany<Attribute>, name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.content.as_str())
}
