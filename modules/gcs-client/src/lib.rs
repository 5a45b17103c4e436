pub mod error;

pub use error::{GcsError, Result};

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

const STORAGE_URL: &str = "https://storage.googleapis.com";

/// GCE metadata server endpoint for Application Default Credentials.
/// `GCS_ACCESS_TOKEN` in the environment bypasses it for local runs.
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh cached tokens this long before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectMeta>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Whole-object read/write client for one GCS bucket.
pub struct GcsClient {
    client: reqwest::Client,
    bucket: String,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl GcsClient {
    pub fn new(bucket: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            bucket: bucket.to_string(),
            base_url: STORAGE_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Current bearer token: `GCS_ACCESS_TOKEN` env var if set, otherwise
    /// fetched from the metadata server and cached until shortly before
    /// expiry.
    async fn access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var("GCS_ACCESS_TOKEN") {
            return Ok(token);
        }

        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let resp = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| GcsError::Auth(format!("metadata server unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(GcsError::Auth(format!(
                "metadata server returned {}",
                resp.status()
            )));
        }

        let token: MetadataToken = resp.json().await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in)
                - TOKEN_EXPIRY_MARGIN,
        });
        Ok(value)
    }

    /// Write raw bytes as one object, overwriting any existing content.
    pub async fn put_bytes(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let token = self.access_token().await?;
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);

        let resp = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .bearer_auth(&token)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GcsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::debug!(bucket = %self.bucket, path, "Uploaded object");
        Ok(())
    }

    /// Serialize a JSON value and write it as one object.
    pub async fn put_json(&self, path: &str, value: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec_pretty(value)?;
        self.put_bytes(path, body, "application/json").await
    }

    /// Read an object and parse it as JSON. Returns `Ok(None)` when the
    /// object does not exist.
    pub async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let token = self.access_token().await?;
        let url = format!("{}/{}/{}", self.base_url, self.bucket, path);

        let resp = self.client.get(&url).bearer_auth(&token).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GcsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let value: serde_json::Value = resp.json().await?;
        Ok(Some(value))
    }

    /// List object names under a prefix, following pagination.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let token = self.access_token().await?;
        let url = format!("{}/storage/v1/b/{}/o", self.base_url, self.bucket);

        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![("prefix", prefix)];
            if let Some(ref t) = page_token {
                query.push(("pageToken", t));
            }

            let resp = self
                .client
                .get(&url)
                .query(&query)
                .bearer_auth(&token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(GcsError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let page: ListResponse = resp.json().await?;
            names.extend(page.items.into_iter().map(|o| o.name));

            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        Ok(names)
    }
}
