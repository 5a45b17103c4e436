//! Video retrieval via yt-dlp.
//!
//! Two entry points mirror the pipeline's two stages: `probe` pulls
//! metadata without downloading (cheap, feeds the pre-filter), `fetch`
//! downloads the artifact plus a `.info.json` sidecar with the full
//! metadata the analysis stage wants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use forkmap_common::VideoMetadata;

use crate::traits::{FetchedVideo, VideoFetcher};

/// Max download attempts for transient yt-dlp failures. Metadata probes
/// are not retried; a failed probe leaves no tracker entry, so the
/// upstream sender can simply resubmit.
const MAX_FETCH_ATTEMPTS: u32 = 3;
/// Base backoff duration. Actual delay is base * 2^attempt + jitter.
const RETRY_BASE: Duration = Duration::from_secs(2);
/// Wall-clock bound per probe attempt.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
/// Wall-clock bound per download attempt.
const FETCH_TIMEOUT: Duration = Duration::from_secs(180);

/// Subset of the yt-dlp info JSON the pipeline cares about.
#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    fulltitle: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    uploader: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    tags: Vec<String>,
}

impl InfoJson {
    fn into_metadata(self) -> VideoMetadata {
        let title = if self.title.is_empty() {
            self.fulltitle
        } else {
            self.title
        };
        VideoMetadata {
            id: self.id,
            title,
            description: self.description,
            uploader: self.uploader,
            duration: self.duration,
            tags: self.tags,
        }
    }
}

pub struct YtDlpFetcher {
    bin: String,
    downloads_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(bin: &str, downloads_dir: &Path) -> Self {
        info!(bin, downloads_dir = %downloads_dir.display(), "Using YtDlpFetcher");
        Self {
            bin: bin.to_string(),
            downloads_dir: downloads_dir.to_path_buf(),
        }
    }

    /// Run yt-dlp and return stdout. Retries on any failure with
    /// exponential backoff (2s, 4s) plus random jitter.
    async fn run_ytdlp(
        &self,
        args: &[&str],
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Vec<u8>> {
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let backoff = RETRY_BASE * 2u32.pow(attempt - 1);
                let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
                warn!(
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    "Retrying yt-dlp after backoff"
                );
                tokio::time::sleep(backoff + jitter).await;
            }

            let result = tokio::time::timeout(
                timeout,
                tokio::process::Command::new(&self.bin).args(args).output(),
            )
            .await;

            match result {
                Ok(Ok(output)) => {
                    if output.status.success() {
                        return Ok(output.stdout);
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    last_error = stderr.lines().last().unwrap_or("unknown error").to_string();
                    warn!(attempt = attempt + 1, stderr = %stderr, "yt-dlp exited with error");
                }
                Ok(Err(e)) => {
                    anyhow::bail!("Failed to run {}: {e}", self.bin);
                }
                Err(_) => {
                    last_error = format!("timed out after {}s", timeout.as_secs());
                    warn!(attempt = attempt + 1, timeout_secs = timeout.as_secs(), "yt-dlp timed out");
                }
            }
        }

        anyhow::bail!("yt-dlp failed after {max_attempts} attempt(s): {last_error}")
    }
}

#[async_trait]
impl VideoFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        info!(url, fetcher = self.name(), "Probing metadata");

        let stdout = self
            .run_ytdlp(
                &["--dump-json", "--no-download", "--no-warnings", url],
                PROBE_TIMEOUT,
                1,
            )
            .await?;

        let info: InfoJson =
            serde_json::from_slice(&stdout).context("Failed to parse yt-dlp metadata")?;
        Ok(info.into_metadata())
    }

    async fn fetch(&self, url: &str) -> Result<FetchedVideo> {
        tokio::fs::create_dir_all(&self.downloads_dir)
            .await
            .context("Failed to create downloads directory")?;

        let template = self.downloads_dir.join("%(id)s.%(ext)s");
        let template = template.to_string_lossy().into_owned();

        info!(url, fetcher = self.name(), "Downloading video");

        let stdout = self
            .run_ytdlp(
                &[
                    "--format",
                    "best",
                    "--write-info-json",
                    "--no-simulate",
                    "--print",
                    "after_move:filepath",
                    "-o",
                    &template,
                    url,
                ],
                FETCH_TIMEOUT,
                MAX_FETCH_ATTEMPTS,
            )
            .await?;

        let printed = String::from_utf8_lossy(&stdout);
        let video_path = PathBuf::from(
            printed
                .lines()
                .last()
                .context("yt-dlp did not report a download path")?
                .trim(),
        );

        let id = video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Downloaded file has no usable name")?
            .to_string();
        let filename = video_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&id)
            .to_string();
        let info_path = video_path.with_extension("info.json");

        // The sidecar is the authoritative title/uploader for the entry.
        let (title, uploader) = match read_info_json(&info_path).await {
            Ok(info) => {
                let meta = info.into_metadata();
                (meta.title, meta.uploader)
            }
            Err(e) => {
                warn!(url, error = %e, "Could not read info sidecar after download");
                (String::new(), String::new())
            }
        };

        info!(url, filename = %filename, "Download complete");

        Ok(FetchedVideo {
            id,
            filename,
            video_path,
            info_path,
            title,
            uploader,
        })
    }

    async fn rich_metadata(
        &self,
        video: &FetchedVideo,
        fallback: &VideoMetadata,
    ) -> VideoMetadata {
        match read_info_json(&video.info_path).await {
            Ok(info) => info.into_metadata(),
            Err(e) => {
                warn!(id = %video.id, error = %e, "Falling back to probe metadata");
                fallback.clone()
            }
        }
    }

    fn name(&self) -> &str {
        "yt-dlp"
    }
}

async fn read_info_json(path: &Path) -> Result<InfoJson> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_slice(&bytes).context("Failed to parse info sidecar")?)
}
