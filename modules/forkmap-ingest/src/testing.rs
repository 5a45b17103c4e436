// Test mocks for the ingestion pipeline.
//
// Three mocks matching the three trait boundaries:
// - MemoryStore (ObjectStore): HashMap-backed, optionally failing
// - MockFetcher (VideoFetcher): HashMap-based URL to metadata/artifact
// - MockAnalyzer (VideoAnalyzer): canned result, failure, or persisting
//
// Plus helpers for constructing entries, metadata, and envelopes.
// No network, no subprocesses; `cargo test` runs in seconds.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use forkmap_common::{
    AnalysisResult, Category, Confidence, FilterVerdict, Location, RestaurantRecord,
    TrackerEntry, VideoMetadata,
};

use crate::traits::{FetchedVideo, ObjectStore, VideoAnalyzer, VideoFetcher};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory ObjectStore. `failing()` makes every operation error, for
/// exercising backup-degradation paths.
pub struct MemoryStore {
    objects: Mutex<HashMap<String, serde_json::Value>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn seed_json(&self, path: &str, value: serde_json::Value) {
        self.objects.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn get_object(&self, path: &str) -> Option<serde_json::Value> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_json(&self, path: &str, value: &serde_json::Value) -> Result<()> {
        if self.fail {
            bail!("store unavailable");
        }
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), value.clone());
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>> {
        if self.fail {
            bail!("store unavailable");
        }
        Ok(self.objects.lock().unwrap().get(path).cloned())
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        if self.fail {
            bail!("store unavailable");
        }
        self.blobs.lock().unwrap().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if self.fail {
            bail!("store unavailable");
        }
        let mut names: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .chain(self.blobs.lock().unwrap().keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// HashMap-based fetcher. Errors for unregistered URLs, and counts calls
/// so tests can assert a stage was never reached.
pub struct MockFetcher {
    probes: HashMap<String, VideoMetadata>,
    fetches: HashMap<String, FetchedVideo>,
    probe_count: AtomicU32,
    fetch_count: AtomicU32,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
            fetches: HashMap::new(),
            probe_count: AtomicU32::new(0),
            fetch_count: AtomicU32::new(0),
        }
    }

    pub fn on_probe(mut self, url: &str, meta: VideoMetadata) -> Self {
        self.probes.insert(url.to_string(), meta);
        self
    }

    pub fn on_fetch(mut self, url: &str, video: FetchedVideo) -> Self {
        self.fetches.insert(url.to_string(), video);
        self
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoFetcher for MockFetcher {
    async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        match self.probes.get(url) {
            Some(meta) => Ok(meta.clone()),
            None => bail!("no probe registered for {url}"),
        }
    }

    async fn fetch(&self, url: &str) -> Result<FetchedVideo> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        match self.fetches.get(url) {
            Some(video) => Ok(video.clone()),
            None => bail!("no fetch registered for {url}"),
        }
    }

    async fn rich_metadata(
        &self,
        _video: &FetchedVideo,
        fallback: &VideoMetadata,
    ) -> VideoMetadata {
        fallback.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

pub enum MockAnalyzer {
    /// Return a canned envelope without side effects.
    Returning(AnalysisResult),
    /// Return the envelope and persist it like the real analyzer would.
    Persisting {
        envelope: AnalysisResult,
        video_id: String,
        store: Arc<MemoryStore>,
    },
    /// Fail with a message.
    Failing(String),
}

impl MockAnalyzer {
    pub fn returning(envelope: AnalysisResult) -> Self {
        MockAnalyzer::Returning(envelope)
    }

    pub fn persisting(envelope: AnalysisResult, video_id: &str, store: Arc<MemoryStore>) -> Self {
        MockAnalyzer::Persisting {
            envelope,
            video_id: video_id.to_string(),
            store,
        }
    }

    pub fn failing(message: &str) -> Self {
        MockAnalyzer::Failing(message.to_string())
    }
}

#[async_trait]
impl VideoAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _video: &FetchedVideo,
        _metadata: &VideoMetadata,
        _url: &str,
    ) -> Result<AnalysisResult> {
        match self {
            MockAnalyzer::Returning(envelope) => Ok(envelope.clone()),
            MockAnalyzer::Persisting {
                envelope,
                video_id,
                store,
            } => {
                if envelope.restaurants_found > 0 {
                    store
                        .put_json(
                            &format!("analysis_results/{video_id}_analysis.json"),
                            &serde_json::to_value(envelope)?,
                        )
                        .await?;
                }
                Ok(envelope.clone())
            }
            MockAnalyzer::Failing(message) => bail!("{message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

pub fn probe_meta(id: &str, title: &str) -> VideoMetadata {
    VideoMetadata {
        id: id.to_string(),
        title: title.to_string(),
        uploader: "chef".to_string(),
        ..Default::default()
    }
}

pub fn fetched_video(id: &str) -> FetchedVideo {
    FetchedVideo {
        id: id.to_string(),
        filename: format!("{id}.mp4"),
        video_path: PathBuf::from(format!("/nonexistent/{id}.mp4")),
        info_path: PathBuf::from(format!("/nonexistent/{id}.info.json")),
        title: "best ramen spot".to_string(),
        uploader: "chef".to_string(),
    }
}

pub fn entry_with_category(category: Category) -> TrackerEntry {
    TrackerEntry {
        filename: None,
        title: "best ramen spot".to_string(),
        uploader: "chef".to_string(),
        sender: "alice".to_string(),
        chat: "food club".to_string(),
        downloaded_at: Utc::now(),
        category,
        filter_result: FilterVerdict::Likely,
        restaurants_found: None,
        analysis_file: None,
        analysis_error: None,
    }
}

pub fn restaurant_named(name: &str) -> RestaurantRecord {
    RestaurantRecord {
        order_in_video: 1,
        restaurant_name: name.to_string(),
        confidence: Confidence::High,
        cuisine_type: "Japanese".to_string(),
        location: Location {
            city: Some("Austin".to_string()),
            country: Some("USA".to_string()),
            ..Default::default()
        },
        dishes_shown: vec!["tonkotsu ramen".to_string()],
        food_shot_timestamps: vec!["00:12".to_string()],
        creator_rating_or_opinion: None,
        evidence: vec![],
        notes: None,
        food_images: vec![],
        lat: None,
        lng: None,
    }
}

pub fn envelope_with(url: &str, restaurants: Vec<RestaurantRecord>) -> AnalysisResult {
    AnalysisResult {
        source_url: url.to_string(),
        video_file: "123.mp4".to_string(),
        title: "best ramen spot".to_string(),
        uploader: "chef".to_string(),
        restaurants_found: restaurants.len() as u32,
        restaurants,
    }
}
