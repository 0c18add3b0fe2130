use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credentials rejected by {url} (HTTP {status})")]
    Auth { url: String, status: u16 },

    #[error("{0}")]
    Validation(String),

    #[error("No products to download into {0}. Check your search terms.")]
    NoProducts(String),

    #[error("Checksum mismatch for {title}: expected {expected}, found {found}")]
    Checksum {
        title: String,
        expected: String,
        found: String,
    },

    #[error("Catalog request to {url} failed with HTTP {status}")]
    Catalog { url: String, status: u16 },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
