//! Food-shot frame extraction.
//!
//! The analysis reports 1-3 "MM:SS" timestamps per restaurant where food
//! is clearly on screen. Each one becomes a single-frame ffmpeg grab,
//! uploaded to the object store and recorded on the restaurant. A
//! malformed timestamp or a failed grab costs only that image, never the
//! batch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use forkmap_common::{PipelineError, RestaurantRecord};

use crate::traits::ObjectStore;

/// Wall-clock bound per ffmpeg invocation.
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(15);

/// Object-store prefix shared with the analysis envelopes.
const IMAGE_PREFIX: &str = "analysis_results/";

/// Parse an "MM:SS" timestamp into an ffmpeg `-ss` argument.
/// Returns `None` for anything that is not two colon-separated integers
/// with in-range seconds.
pub fn parse_timestamp(ts: &str) -> Option<String> {
    let (mins, secs) = ts.trim().split_once(':')?;
    let mins: u32 = mins.parse().ok()?;
    let secs: u32 = secs.parse().ok()?;
    if secs >= 60 {
        return None;
    }
    let total = mins * 60 + secs;
    Some(format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    ))
}

pub struct FrameExtractor {
    store: Arc<dyn ObjectStore>,
    ffmpeg_bin: String,
}

impl FrameExtractor {
    pub fn new(store: Arc<dyn ObjectStore>, ffmpeg_bin: &str) -> Self {
        Self {
            store,
            ffmpeg_bin: ffmpeg_bin.to_string(),
        }
    }

    /// Extract and upload the reported food shots for each record,
    /// filling `food_images` with the object names that actually made it.
    pub async fn extract_for(
        &self,
        video_path: &Path,
        video_id: &str,
        restaurants: &mut [RestaurantRecord],
    ) {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(video_id, error = %e, "No scratch dir for frame extraction, skipping");
                return;
            }
        };

        for (r, restaurant) in restaurants.iter_mut().enumerate() {
            let timestamps = restaurant.food_shot_timestamps.clone();
            let mut food_images = Vec::new();

            for (s, ts) in timestamps.iter().enumerate() {
                let Some(seek) = parse_timestamp(ts) else {
                    warn!(video_id, ts, "Discarding malformed food shot timestamp");
                    continue;
                };

                let object_name = format!("{video_id}_{}_{}.jpg", r + 1, s + 1);
                let out_path = scratch.path().join(&object_name);

                match self
                    .extract_one(video_path, &seek, &out_path, &object_name)
                    .await
                {
                    Ok(()) => {
                        info!(video_id, ts, object = %object_name, "Extracted food frame");
                        food_images.push(object_name);
                    }
                    Err(e) => warn!(video_id, ts, error = %e, "Frame extraction failed"),
                }
            }

            restaurant.food_images = food_images;
        }
    }

    async fn extract_one(
        &self,
        video_path: &Path,
        seek: &str,
        out_path: &Path,
        object_name: &str,
    ) -> Result<(), PipelineError> {
        let result = tokio::time::timeout(
            FFMPEG_TIMEOUT,
            tokio::process::Command::new(&self.ffmpeg_bin)
                .arg("-ss")
                .arg(seek)
                .arg("-i")
                .arg(video_path)
                .args(["-vframes", "1", "-q:v", "2", "-y"])
                .arg(out_path)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PipelineError::FrameExtraction(format!(
                    "failed to run {}: {e}",
                    self.ffmpeg_bin
                )))
            }
            Err(_) => {
                return Err(PipelineError::FrameExtraction(format!(
                    "ffmpeg timed out after {}s",
                    FFMPEG_TIMEOUT.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::FrameExtraction(
                stderr.lines().last().unwrap_or("ffmpeg failed").to_string(),
            ));
        }

        let bytes = tokio::fs::read(out_path)
            .await
            .map_err(|e| PipelineError::FrameExtraction(format!("no frame produced: {e}")))?;
        if bytes.is_empty() {
            return Err(PipelineError::FrameExtraction("empty frame produced".to_string()));
        }

        self.store
            .put_bytes(&format!("{IMAGE_PREFIX}{object_name}"), bytes, "image/jpeg")
            .await
            .map_err(|e| PipelineError::FrameExtraction(format!("frame upload failed: {e}")))?;

        Ok(())
    }
}
