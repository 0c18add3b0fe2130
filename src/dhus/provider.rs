use super::feed::Feed;
use super::opensearch_query;
use crate::catalog::{Catalog, Product, ProductQuery};
use crate::error::Error;
use anyhow::Result;
use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://scihub.copernicus.eu/dhus";

const PAGE_SIZE: usize = 100;

/// An authenticated session against one DHuS instance. Every request carries the
/// credentials the session was connected with.
pub struct Provider {
    client: Client,
    api_url: String,
    username: String,
    password: String,
}

impl Provider {
    /// Opens a session and checks the credentials with an empty query.
    pub async fn connect(username: &str, password: &str, api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)?.as_str().trim_end_matches('/').to_string();
        let provider = Self {
            client: Client::new(),
            api_url,
            username: username.to_string(),
            password: password.to_string(),
        };

        provider.search_page("*", 0, 0).await?;
        info!("Connected to {} as {}", provider.api_url, provider.username);
        Ok(provider)
    }

    fn authorized(self: &Self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    async fn send(self: &Self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        check_status(response, url)
    }

    async fn search_page(self: &Self, q: &str, start: usize, rows: usize) -> Result<Feed> {
        let rows = rows.to_string();
        let start = start.to_string();
        let url = Url::parse_with_params(
            &format!("{}/search", self.api_url),
            &[
                ("format", "json"),
                ("rows", rows.as_str()),
                ("start", start.as_str()),
                ("q", q),
            ],
        )?;
        let response = self.send(self.client.get(url.clone()), url.as_str()).await?;
        let content = response.text().await?;
        Feed::parse(&content)
    }

    fn product_url(self: &Self, uuid: &str) -> String {
        format!("{}/odata/v1/Products('{}')", self.api_url, uuid)
    }

    /// The MD5 checksum published for a product, if any.
    async fn checksum(self: &Self, uuid: &str) -> Result<Option<String>> {
        let url = format!("{}?$format=json", self.product_url(uuid));
        let response = self.send(self.client.get(&url), &url).await?;
        let metadata: serde_json::Value = response.json().await?;
        Ok(extract_checksum(&metadata))
    }
}

impl Catalog for Provider {
    async fn query(self: &Self, query: &ProductQuery) -> Result<Vec<Product>> {
        let q = opensearch_query(query);
        debug!("Querying {} with: {}", self.api_url, q);

        let mut products = vec![];
        let mut start = 0;
        loop {
            let feed = self.search_page(&q, start, PAGE_SIZE).await?;
            let total = feed.total_results()?;
            let entries = feed.entries();
            let page_len = entries.len();

            for entry in entries {
                let title = entry.title().to_string();
                match entry.into_product() {
                    Ok(product) => products.push(product),
                    Err(e) => warn!("Ignoring catalog entry {}: {:#}", title, e),
                }
            }

            start += page_len;
            if page_len == 0 || start >= total {
                break;
            }
        }
        Ok(products)
    }

    async fn download(self: &Self, product: &Product, output_dir: &Path) -> Result<PathBuf> {
        let dst = output_dir.join(product.archive_name());
        if dst.exists() {
            debug!("Output file already exists");
            return Ok(dst);
        }

        // Check if partial file exists and get its size
        let partial = output_dir.join(format!("{}.partial", product.archive_name()));
        let mut partial_file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&partial)?;
        let mut byte_count = partial_file.metadata()?.len();

        let url = format!("{}/$value", self.product_url(&product.uuid));
        let mut request = self.client.get(&url);
        if byte_count > 0 {
            info!("Resuming download of {} from byte {}", product.title, byte_count);
            request = request.header(RANGE, format!("bytes={}-", byte_count));
        }
        let response = self.authorized(request).send().await?;

        if byte_count > 0 && response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!("Partial file for {} is already complete", product.title);
        } else {
            let response = check_status(response, &url)?;
            if byte_count > 0 && response.status() != StatusCode::PARTIAL_CONTENT {
                warn!("Server ignored the range request, restarting {}", product.title);
                partial_file.set_len(0)?;
                byte_count = 0;
            }

            let mut stream = response.bytes_stream();
            while let Some(bytes) = stream.next().await {
                let bytes = bytes?;
                partial_file.write_all(&bytes)?;
                byte_count += bytes.len() as u64;
            }
            partial_file.flush()?;
        }
        debug!("Received {} bytes for {}", byte_count, product.title);

        let published = match self.checksum(&product.uuid).await {
            Ok(checksum) => checksum,
            Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Auth { .. })) => {
                return Err(e)
            }
            Err(e) => {
                warn!("Unable to look up checksum for {}: {:#}", product.title, e);
                None
            }
        };

        match published {
            Some(expected) => {
                let found = md5_hex(&partial)?;
                if !found.eq_ignore_ascii_case(&expected) {
                    fs::remove_file(&partial)?;
                    return Err(Error::Checksum {
                        title: product.title.clone(),
                        expected,
                        found,
                    }
                    .into());
                }
            }
            None => debug!("No checksum published for {}", product.title),
        }

        // Rename the file to remove .partial suffix
        fs::rename(&partial, &dst)?;
        info!("Download complete: {}", dst.display());
        Ok(dst)
    }
}

fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Auth {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    if !status.is_success() {
        return Err(Error::Catalog {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    Ok(response)
}

fn extract_checksum(metadata: &serde_json::Value) -> Option<String> {
    let checksum = metadata.get("d")?.get("Checksum")?;
    let algorithm = checksum.get("Algorithm")?.as_str()?;
    if !algorithm.eq_ignore_ascii_case("md5") {
        return None;
    }
    Some(checksum.get("Value")?.as_str()?.to_owned())
}

fn md5_hex(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0_u8; 1 << 20];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}
