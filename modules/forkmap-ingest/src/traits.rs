// Trait abstractions for the pipeline's external collaborators.
//
// VideoFetcher replaces direct yt-dlp invocation, VideoAnalyzer the Gemini
// call chain, ObjectStore the GCS client. These enable deterministic
// pipeline tests with in-memory mocks: no network, no subprocesses.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use forkmap_common::{AnalysisResult, VideoMetadata};

/// A downloaded artifact plus its metadata sidecar.
#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub id: String,
    /// Basename of the artifact, e.g. `7607882255670840590.mp4`.
    pub filename: String,
    pub video_path: PathBuf,
    pub info_path: PathBuf,
    pub title: String,
    pub uploader: String,
}

#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Fetch metadata for a URL without downloading the artifact.
    async fn probe(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the artifact and its metadata sidecar.
    async fn fetch(&self, url: &str) -> Result<FetchedVideo>;

    /// Full metadata from the sidecar written by [`fetch`](Self::fetch);
    /// falls back to the probe metadata when the sidecar is unreadable.
    async fn rich_metadata(
        &self,
        video: &FetchedVideo,
        fallback: &VideoMetadata,
    ) -> VideoMetadata;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    /// Analyze a downloaded video for restaurant content. Enriches each
    /// record with extracted frames and coordinates, persists the envelope
    /// when restaurants were found, and returns it.
    async fn analyze(
        &self,
        video: &FetchedVideo,
        metadata: &VideoMetadata,
        url: &str,
    ) -> Result<AnalysisResult>;
}

/// Whole-object blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_json(&self, path: &str, value: &serde_json::Value) -> Result<()>;
    async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>>;
    async fn put_bytes(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl ObjectStore for gcs_client::GcsClient {
    async fn put_json(&self, path: &str, value: &serde_json::Value) -> Result<()> {
        Ok(self.put_json(path, value).await?)
    }

    async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.get_json(path).await?)
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        Ok(self.put_bytes(path, bytes, content_type).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.list(prefix).await?)
    }
}
