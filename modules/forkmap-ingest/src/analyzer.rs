//! AI restaurant analysis over downloaded videos.
//!
//! Uploads the artifact to the Gemini Files API, waits for ingestion,
//! asks for a schema-constrained JSON list of restaurants, then enriches
//! each record with extracted frames and coordinates before persisting
//! the per-video envelope.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use forkmap_common::{
    AnalysisResult, Confidence, Location, RestaurantRecord, VideoMetadata,
};
use gemini_client::GeminiClient;

use crate::frames::FrameExtractor;
use crate::geocode::Geocoder;
use crate::traits::{FetchedVideo, ObjectStore, VideoAnalyzer};

const MODEL: &str = "gemini-2.5-flash";

const ANALYSIS_PROMPT: &str = r#"You are a food content analyst extracting restaurant information from short-form videos.

You will receive a video and its metadata. Identify EVERY restaurant, cafe, bar, food stall, or food establishment featured — a single video may cover several (ranking lists, food crawls, travel vlogs with a dinner scene). Return one entry per establishment, in order of appearance.

Analyze all available signals:
- Visual: signage, menus, receipts, packaging, decor, plating, street scenes, scene transitions indicating a new location.
- Audio/transcript: spoken restaurant names, neighborhoods, cities, addresses, "we're at...", "next spot...", spoken rankings.
- Text overlays: on-screen names, captions, hashtags, displayed rankings, geotags, watermarks.
- Metadata: description, hashtags, tagged location, creator profile cues.

Rules:
- Never combine multiple restaurants into one entry.
- Fill in what you can confidently determine; leave fields empty rather than guess.
- If a scene change reveals an unidentifiable restaurant, still emit an entry with restaurant_name "Unknown" and whatever partial information you gathered.
- Return an empty array only when the video contains genuinely zero restaurant or food-establishment content (pure gaming, makeup, home cooking with no restaurant, fitness).
- For each restaurant pick 1-3 "MM:SS" timestamps where the food is most clearly and appetizingly visible. If no clear food shot exists, return an empty list for that restaurant."#;

/// What the model returns for each identified restaurant. Converted into
/// a domain record before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRestaurant {
    /// 1-based position of this restaurant in the video
    #[serde(default)]
    pub order_in_video: u32,
    /// Name, or "Unknown" when not identifiable
    #[serde(default)]
    pub restaurant_name: String,
    #[serde(default)]
    pub confidence: Confidence,
    /// e.g. "Korean BBQ", "Mexican", "Italian"
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub dishes_shown: Vec<String>,
    /// "MM:SS" moments where food is most clearly visible
    #[serde(default)]
    pub food_shot_timestamps: Vec<String>,
    /// What the creator said about this spot, if anything
    #[serde(default)]
    pub creator_rating_or_opinion: Option<String>,
    /// The signals that led to this conclusion
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExtractedRestaurant {
    fn into_record(self) -> RestaurantRecord {
        RestaurantRecord {
            order_in_video: self.order_in_video,
            restaurant_name: self.restaurant_name,
            confidence: self.confidence,
            cuisine_type: self.cuisine_type,
            location: self.location,
            dishes_shown: self.dishes_shown,
            food_shot_timestamps: self.food_shot_timestamps,
            creator_rating_or_opinion: self.creator_rating_or_opinion,
            evidence: self.evidence,
            notes: self.notes,
            food_images: Vec::new(),
            lat: None,
            lng: None,
        }
    }
}

/// The model is asked for an array but occasionally returns a lone object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtractionPayload {
    Many(Vec<ExtractedRestaurant>),
    One(ExtractedRestaurant),
}

impl ExtractionPayload {
    fn into_vec(self) -> Vec<ExtractedRestaurant> {
        match self {
            ExtractionPayload::Many(v) => v,
            ExtractionPayload::One(r) => vec![r],
        }
    }
}

pub struct GeminiAnalyzer {
    gemini: GeminiClient,
    store: Arc<dyn ObjectStore>,
    geocoder: Geocoder,
    frames: FrameExtractor,
}

impl GeminiAnalyzer {
    pub fn new(
        gemini: GeminiClient,
        store: Arc<dyn ObjectStore>,
        geocoder: Geocoder,
        frames: FrameExtractor,
    ) -> Self {
        Self {
            gemini,
            store,
            geocoder,
            frames,
        }
    }

    fn build_prompt(metadata: &VideoMetadata) -> String {
        format!(
            "{ANALYSIS_PROMPT}\n\n## Video Metadata\n- Title: {}\n- Description: {}\n- Uploader: {}\n- Tags: {}",
            metadata.title,
            metadata.description,
            metadata.uploader,
            metadata.tags.join(", "),
        )
    }

    fn parse_restaurants(text: &str) -> Vec<RestaurantRecord> {
        match serde_json::from_str::<ExtractionPayload>(text) {
            Ok(payload) => payload
                .into_vec()
                .into_iter()
                .map(ExtractedRestaurant::into_record)
                .collect(),
            Err(e) => {
                let snippet: String = text.chars().take(200).collect();
                warn!(error = %e, snippet = %snippet, "Could not parse analysis response");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl VideoAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        video: &FetchedVideo,
        metadata: &VideoMetadata,
        url: &str,
    ) -> Result<AnalysisResult> {
        let bytes = tokio::fs::read(&video.video_path)
            .await
            .with_context(|| format!("Video not found: {}", video.video_path.display()))?;

        info!(filename = %video.filename, size = bytes.len(), "Uploading video for analysis");
        let uploaded = self
            .gemini
            .upload_file(bytes, "video/mp4", &video.filename)
            .await?;
        let active = self.gemini.wait_for_active(uploaded).await?;

        let prompt = Self::build_prompt(metadata);
        let schema = serde_json::to_value(schema_for!(Vec<ExtractedRestaurant>))
            .context("Failed to build response schema")?;

        info!(model = MODEL, id = %video.id, "Analyzing video");
        let text = self
            .gemini
            .generate_json(MODEL, &active, &prompt, Some(schema))
            .await?;

        let mut restaurants = Self::parse_restaurants(&text);

        if !restaurants.is_empty() {
            self.frames
                .extract_for(&video.video_path, &video.id, &mut restaurants)
                .await;

            for restaurant in &mut restaurants {
                if let Some(coords) = self.geocoder.resolve(&restaurant.location).await {
                    restaurant.lat = Some(coords.lat);
                    restaurant.lng = Some(coords.lng);
                }
            }
        }

        let result = AnalysisResult {
            source_url: url.to_string(),
            video_file: video.filename.clone(),
            title: metadata.title.clone(),
            uploader: metadata.uploader.clone(),
            restaurants_found: restaurants.len() as u32,
            restaurants,
        };

        if result.restaurants_found > 0 {
            let object = format!("analysis_results/{}_analysis.json", video.id);
            let value = serde_json::to_value(&result)?;
            self.store
                .put_json(&object, &value)
                .await
                .context("Failed to persist analysis envelope")?;
            info!(object = %object, count = result.restaurants_found, "Saved analysis envelope");
        } else {
            info!(id = %video.id, "No restaurants found, skipping envelope save");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_restaurants_accepts_array() {
        let text = r#"[{"order_in_video": 1, "restaurant_name": "Ramen Tatsuya", "confidence": "high"}]"#;
        let records = GeminiAnalyzer::parse_restaurants(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].restaurant_name, "Ramen Tatsuya");
        assert!(records[0].lat.is_none());
    }

    #[test]
    fn parse_restaurants_wraps_single_object() {
        let text = r#"{"order_in_video": 1, "restaurant_name": "Lone Spot"}"#;
        let records = GeminiAnalyzer::parse_restaurants(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].restaurant_name, "Lone Spot");
    }

    #[test]
    fn parse_restaurants_degrades_to_empty_on_junk() {
        assert!(GeminiAnalyzer::parse_restaurants("not json at all").is_empty());
    }

    #[test]
    fn prompt_includes_metadata_context() {
        let meta = VideoMetadata {
            title: "best ramen spot in Austin".to_string(),
            uploader: "chef".to_string(),
            tags: vec!["foodtok".to_string(), "austin".to_string()],
            ..Default::default()
        };
        let prompt = GeminiAnalyzer::build_prompt(&meta);
        assert!(prompt.contains("best ramen spot in Austin"));
        assert!(prompt.contains("foodtok, austin"));
    }

    #[test]
    fn response_schema_derives() {
        let schema = serde_json::to_value(schema_for!(Vec<ExtractedRestaurant>)).unwrap();
        assert!(schema.is_object());
    }
}
