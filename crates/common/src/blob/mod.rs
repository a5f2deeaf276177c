//! Blob store client
//!
//! The blob store holds PDF bytes keyed by filename; the workflow only ever
//! needs delete-by-key (uploads happen from the client side, the record just
//! carries the resulting URL and filename).

use crate::config::BlobConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Delete-by-key seam over the blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Delete the blob stored under `key`
    async fn delete(&self, key: &str) -> Result<()>;
}

/// HTTP blob store client (reqwest)
pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl HttpBlobStore {
    /// Create a client from configuration
    pub fn new(config: &BlobConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build blob client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn delete(&self, key: &str) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, key);

        let mut request = self.client.delete(&url);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(AppError::Blob {
                message: format!("Blob delete for {} returned {}", key, response.status()),
            })
        }
    }
}
