//! Seeding the in-memory catalog from a JSON file.

use std::path::{Path, PathBuf};

use store::{InMemoryShopStore, NewProduct};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses a JSON array of products.
///
/// ```json
/// [{"name": "Desk Lamp", "unit_price": 4999, "category": "Lighting", "stock": 10}]
/// ```
pub fn parse_catalog(json: &str) -> Result<Vec<NewProduct>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads `path` and inserts every product into `store`.
///
/// Returns the number of products added.
pub async fn seed_from_file(
    store: &InMemoryShopStore,
    path: &Path,
) -> Result<usize, CatalogFileError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let products = parse_catalog(&contents).map_err(|source| CatalogFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let count = products.len();
    for product in products {
        store.insert_product(product).await;
    }
    tracing::info!(count, path = %path.display(), "catalog seeded");
    Ok(count)
}
