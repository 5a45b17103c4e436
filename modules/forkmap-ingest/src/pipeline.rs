//! The per-URL orchestration state machine.
//!
//! One submission runs the stages strictly in order; each stage's output
//! feeds the next and every transition is explicit in [`Stage`]:
//!
//! - DedupCheck: duplicate -> Done(skipped), no tracker write
//! - ExtractMetadata: failure -> PipelineError::Metadata, no tracker write
//! - Filter: unlikely -> tracker write + Done(skipped)
//! - Download: failure -> PipelineError::Download, no tracker write
//! - Analyze: failure is caught -> Cleanup with the error recorded
//! - Cleanup: always -> Persist; deletion failures logged only
//! - Persist: tracker write, rebuild on restaurant -> Done(completed)
//!
//! After a successful download the URL is committed: whatever happens in
//! analysis, the run ends with a persisted, categorized tracker entry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use forkmap_common::{
    relevance, AnalysisResult, Category, FilterVerdict, PipelineError, TrackerEntry,
    VideoMetadata,
};

use crate::aggregate;
use crate::tracker::UrlTracker;
use crate::traits::{FetchedVideo, ObjectStore, VideoAnalyzer, VideoFetcher};

/// One submitted URL with its chat provenance.
#[derive(Debug, Clone)]
pub struct Submission {
    pub url: String,
    pub chat_name: String,
    pub sender: String,
}

/// Terminal result of a pipeline run, as reported to the caller.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Duplicate or filtered out before download.
    Skipped {
        message: String,
        title: Option<String>,
        filter_result: Option<FilterVerdict>,
    },
    /// Ran to persistence, in any category.
    Completed {
        category: Category,
        message: String,
        filename: String,
        title: String,
        filter_result: FilterVerdict,
        restaurants_found: u32,
        analysis: Option<AnalysisResult>,
    },
}

enum Stage {
    DedupCheck,
    ExtractMetadata,
    Filter {
        meta: VideoMetadata,
    },
    Download {
        meta: VideoMetadata,
        verdict: FilterVerdict,
    },
    Analyze {
        video: FetchedVideo,
        meta: VideoMetadata,
        verdict: FilterVerdict,
    },
    Cleanup {
        video: FetchedVideo,
        verdict: FilterVerdict,
        analysis: Result<AnalysisResult, PipelineError>,
    },
    Persist {
        video: FetchedVideo,
        verdict: FilterVerdict,
        analysis: Result<AnalysisResult, PipelineError>,
    },
    Done(ProcessOutcome),
}

pub struct Pipeline {
    tracker: Arc<UrlTracker>,
    fetcher: Arc<dyn VideoFetcher>,
    analyzer: Arc<dyn VideoAnalyzer>,
    store: Arc<dyn ObjectStore>,
}

impl Pipeline {
    pub fn new(
        tracker: Arc<UrlTracker>,
        fetcher: Arc<dyn VideoFetcher>,
        analyzer: Arc<dyn VideoAnalyzer>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            tracker,
            fetcher,
            analyzer,
            store,
        }
    }

    pub fn tracker(&self) -> &UrlTracker {
        &self.tracker
    }

    /// Run one submission to its terminal state.
    pub async fn run(&self, submission: &Submission) -> Result<ProcessOutcome, PipelineError> {
        let url = submission.url.as_str();
        let mut stage = Stage::DedupCheck;

        loop {
            stage = match stage {
                Stage::DedupCheck => {
                    if self.tracker.is_duplicate(url).await? {
                        info!(url, "Already processed, skipping");
                        Stage::Done(ProcessOutcome::Skipped {
                            message: "Already processed".to_string(),
                            title: None,
                            filter_result: None,
                        })
                    } else {
                        Stage::ExtractMetadata
                    }
                }

                Stage::ExtractMetadata => {
                    let meta = self
                        .fetcher
                        .probe(url)
                        .await
                        .map_err(|e| PipelineError::Metadata(e.to_string()))?;
                    Stage::Filter { meta }
                }

                Stage::Filter { meta } => {
                    let verdict = relevance(&meta);
                    info!(url, %verdict, title = %truncate(&meta.title, 60), "Pre-filter verdict");

                    if verdict == FilterVerdict::Unlikely {
                        let entry = TrackerEntry {
                            filename: None,
                            title: meta.title.clone(),
                            uploader: meta.uploader.clone(),
                            sender: submission.sender.clone(),
                            chat: submission.chat_name.clone(),
                            downloaded_at: Utc::now(),
                            category: Category::SkippedNotRestaurant,
                            filter_result: verdict,
                            restaurants_found: None,
                            analysis_file: None,
                            analysis_error: None,
                        };
                        self.tracker.record(url, entry).await?;
                        Stage::Done(ProcessOutcome::Skipped {
                            message: format!("Not restaurant-related (filter: {verdict})"),
                            title: Some(meta.title),
                            filter_result: Some(verdict),
                        })
                    } else {
                        Stage::Download { meta, verdict }
                    }
                }

                Stage::Download { meta, verdict } => {
                    let video = self
                        .fetcher
                        .fetch(url)
                        .await
                        .map_err(|e| PipelineError::Download(e.to_string()))?;
                    // The sidecar written during download carries the full
                    // description/tags the analysis stage wants.
                    let meta = self.fetcher.rich_metadata(&video, &meta).await;
                    Stage::Analyze {
                        video,
                        meta,
                        verdict,
                    }
                }

                Stage::Analyze {
                    video,
                    meta,
                    verdict,
                } => {
                    // Caught, not propagated: the URL is committed once the
                    // download succeeded, so the run continues to cleanup
                    // and persistence with the error recorded.
                    let analysis = match self.analyzer.analyze(&video, &meta, url).await {
                        Ok(result) => Ok(result),
                        Err(e) => {
                            let err = PipelineError::Analysis(e.to_string());
                            warn!(url, error = %err, "Continuing with failed analysis");
                            Err(err)
                        }
                    };
                    Stage::Cleanup {
                        video,
                        verdict,
                        analysis,
                    }
                }

                Stage::Cleanup {
                    video,
                    verdict,
                    analysis,
                } => {
                    self.cleanup(&video).await;
                    Stage::Persist {
                        video,
                        verdict,
                        analysis,
                    }
                }

                Stage::Persist {
                    video,
                    verdict,
                    analysis,
                } => {
                    let outcome = self
                        .persist(submission, video, verdict, analysis)
                        .await?;
                    Stage::Done(outcome)
                }

                Stage::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Delete the artifact and its sidecar. Absence is fine; anything
    /// else is logged and ignored.
    async fn cleanup(&self, video: &FetchedVideo) {
        for path in [&video.video_path, &video.info_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!(path = %path.display(), "Deleted local artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Cleanup failed"),
            }
        }
    }

    async fn persist(
        &self,
        submission: &Submission,
        video: FetchedVideo,
        verdict: FilterVerdict,
        analysis: Result<AnalysisResult, PipelineError>,
    ) -> Result<ProcessOutcome, PipelineError> {
        let (category, analysis_error, analysis) = match analysis {
            Err(error) => (Category::AnalysisFailed, Some(error.to_string()), None),
            Ok(result) if result.restaurants_found > 0 => {
                (Category::Restaurant, None, Some(result))
            }
            Ok(result) => (Category::NotRestaurant, None, Some(result)),
        };
        let restaurants_found = analysis.as_ref().map(|a| a.restaurants_found).unwrap_or(0);

        let entry = TrackerEntry {
            filename: Some(video.filename.clone()),
            title: video.title.clone(),
            uploader: video.uploader.clone(),
            sender: submission.sender.clone(),
            chat: submission.chat_name.clone(),
            downloaded_at: Utc::now(),
            category,
            filter_result: verdict,
            restaurants_found: Some(restaurants_found),
            analysis_file: (category == Category::Restaurant)
                .then(|| format!("{}_analysis.json", video.id)),
            analysis_error,
        };
        self.tracker.record(&submission.url, entry).await?;

        if category == Category::Restaurant {
            match aggregate::rebuild(self.store.as_ref()).await {
                Ok(count) => info!(count, "Rebuilt aggregate dataset"),
                Err(e) => warn!(error = %e, "Aggregate rebuild failed"),
            }
        }

        info!(url = %submission.url, %category, restaurants_found, "Pipeline run complete");

        Ok(ProcessOutcome::Completed {
            category,
            message: format!("{category}: {restaurants_found} restaurant(s) found"),
            filename: video.filename,
            title: video.title,
            filter_result: verdict,
            restaurants_found,
            analysis,
        })
    }
}

/// Char-boundary-safe prefix for log lines.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
