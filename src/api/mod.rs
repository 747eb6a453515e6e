//! HTTP client for the tile-serving backend.
//!
//! The backend resolves `(product, zoom, row, col)` to image bytes, lists
//! the available imagery products, and accepts fire-and-forget requests to
//! pre-generate a tile range in the background. The viewer core only ever
//! consumes the tile endpoint (through the [`TileFetcher`] seam); the rest
//! is for the hosting shell.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::core::grid::TileKey;
use crate::tiles::fetch::FetchError;
use crate::{Result, ViewerError};

/// Shared async HTTP client. Built once so TLS and connection-pool setup
/// is not repeated per tile.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("lunaview/0.1.0")
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// An imagery product served by the backend. Immutable once fetched;
/// replaced wholesale when the user switches products.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_zoom: u8,
    #[serde(default)]
    pub cached_tiles: u64,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    products: Vec<Product>,
}

/// Backend acknowledgement of a background tile-generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationReceipt {
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Backend acknowledgement of a product cache wipe.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearReceipt {
    pub message: String,
    #[serde(default)]
    pub tiles_deleted: u64,
}

/// Anything that can resolve a tile key to raw image bytes.
///
/// The fetch coordinator is generic over this seam so tests can substitute
/// a scripted fetcher for the real HTTP backend.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch_tile(
        &self,
        product_id: &str,
        key: TileKey,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Client for the tile server's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpTileApi {
    base_url: String,
}

impl HttpTileApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// URL of the tile endpoint for a key.
    pub fn tile_url(&self, product_id: &str, key: TileKey) -> String {
        format!(
            "{}/tile/{}/{}/{}/{}",
            self.base_url, product_id, key.zoom, key.row, key.col
        )
    }

    /// Lists the available imagery products.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let url = format!("{}/products", self.base_url);
        let envelope: ProductsEnvelope = HTTP_CLIENT
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.products)
    }

    /// Fetches refreshed metadata for one product (e.g. after a generation
    /// request has had time to populate the backend cache).
    pub async fn product_info(&self, product_id: &str) -> Result<Product> {
        let url = format!("{}/info/{}", self.base_url, product_id);
        let response = HTTP_CLIENT.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ViewerError::UnknownProduct(product_id.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Asks the backend to pre-generate a tile range in the background.
    ///
    /// Fire-and-forget: the viewer never depends on completion, and the
    /// backend reports progress out-of-band. A rejection surfaces as an
    /// [`ViewerError::Api`] with the backend's detail text.
    pub async fn request_generation(
        &self,
        product_id: &str,
        zoom: u8,
        rows: RangeInclusive<u32>,
        cols: RangeInclusive<u32>,
    ) -> Result<GenerationReceipt> {
        let url = format!("{}/generate/{}", self.base_url, product_id);
        let response = HTTP_CLIENT
            .post(&url)
            .query(&[
                ("zoom", zoom as u32),
                ("start_row", *rows.start()),
                ("end_row", *rows.end()),
                ("start_col", *cols.start()),
                ("end_col", *cols.end()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ViewerError::Api(format!(
                "generation request rejected ({}): {}",
                status, detail
            )));
        }
        Ok(response.json().await?)
    }

    /// Wipes the backend's cached tiles for a product.
    pub async fn clear_cache(&self, product_id: &str) -> Result<ClearReceipt> {
        let url = format!("{}/cache/{}", self.base_url, product_id);
        let response = HTTP_CLIENT.delete(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ViewerError::UnknownProduct(product_id.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl TileFetcher for HttpTileApi {
    async fn fetch_tile(
        &self,
        product_id: &str,
        key: TileKey,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.tile_url(product_id, key);
        let response = HTTP_CLIENT
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !response.status().is_success() {
            return Err(FetchError::Transport(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_building() {
        let api = HttpTileApi::new("http://localhost:8000/");
        assert_eq!(
            api.tile_url("wac_global", TileKey::new(3, 2, 5)),
            "http://localhost:8000/tile/wac_global/3/2/5"
        );
    }

    #[test]
    fn test_products_envelope_deserialization() {
        let json = r#"{
            "products": [
                {
                    "id": "wac_global",
                    "name": "WAC Global Mosaic 100m",
                    "description": "Wide Angle Camera global mosaic",
                    "max_zoom": 7,
                    "cached_tiles": 42,
                    "format": "jpg",
                    "layer": "ignored_extra_field"
                }
            ],
            "source": "WMTS"
        }"#;
        let envelope: ProductsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.products.len(), 1);
        let p = &envelope.products[0];
        assert_eq!(p.id, "wac_global");
        assert_eq!(p.max_zoom, 7);
        assert_eq!(p.cached_tiles, 42);
        assert_eq!(p.format.as_deref(), Some("jpg"));
    }

    #[test]
    fn test_product_optional_fields_default() {
        let json = r#"{ "id": "x", "name": "X", "max_zoom": 5 }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.description, "");
        assert_eq!(p.cached_tiles, 0);
        assert!(p.format.is_none());
    }
}
