pub mod error;

pub use error::{NominatimError, Result};

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

const BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim usage policy: at most one request per second, with an
/// identifying User-Agent. https://operations.osmfoundation.org/policies/nominatim/
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "forkmap/0.1 (chat-video restaurant mapper)";

/// A single search result. Nominatim serializes coordinates as strings.
#[derive(Debug, Clone, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Client for the Nominatim search API. The inter-request spacing is
/// enforced across every caller of one client instance, so the process
/// should construct exactly one and share it.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: BASE_URL.to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
            last_request: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Block until the minimum spacing since the previous request has
    /// elapsed, then claim the current instant as the new last-request
    /// time. Callers serialize on the internal mutex, so the spacing
    /// holds process-wide, not per-caller.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Resolve a free-form query to coordinates, taking the first match.
    /// Returns `Ok(None)` when the service has no result for the query.
    pub async fn search(&self, query: &str) -> Result<Option<(f64, f64)>> {
        self.pace().await;

        tracing::debug!(query, "Nominatim search");

        let url = format!("{}/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NominatimError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let hits: Vec<SearchHit> = resp.json().await?;
        let Some(hit) = hits.first() else {
            tracing::debug!(query, "Nominatim returned no results");
            return Ok(None);
        };

        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|_| NominatimError::Parse(format!("bad latitude: {}", hit.lat)))?;
        let lng: f64 = hit
            .lon
            .parse()
            .map_err(|_| NominatimError::Parse(format!("bad longitude: {}", hit.lon)))?;

        tracing::info!(query, lat, lng, "Geocoded");
        Ok(Some((lat, lng)))
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new()
    }
}
