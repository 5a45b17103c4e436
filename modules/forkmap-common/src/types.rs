use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Enums ---

/// Verdict of the cheap metadata pre-filter. `Maybe` is the permissive
/// default near the boundary: a wasted analysis costs less than a missed
/// restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    Likely,
    Maybe,
    Unlikely,
}

impl std::fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterVerdict::Likely => write!(f, "likely"),
            FilterVerdict::Maybe => write!(f, "maybe"),
            FilterVerdict::Unlikely => write!(f, "unlikely"),
        }
    }
}

/// Final processing category recorded in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SkippedNotRestaurant,
    Restaurant,
    NotRestaurant,
    AnalysisFailed,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::SkippedNotRestaurant => write!(f, "skipped_not_restaurant"),
            Category::Restaurant => write!(f, "restaurant"),
            Category::NotRestaurant => write!(f, "not_restaurant"),
            Category::AnalysisFailed => write!(f, "analysis_failed"),
        }
    }
}

/// How confident the analysis was in a restaurant identification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

// --- Location ---

/// Structured location as reported by analysis. All fields optional;
/// an entirely empty location is never geocoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_or_region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub specific_address: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.state_or_region.is_none()
            && self.country.is_none()
            && self.neighborhood.is_none()
            && self.specific_address.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// --- Restaurant analysis output ---

/// One identified establishment within one video. Created by the analysis
/// stage, enriched in place with extracted frames and coordinates, then
/// immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub order_in_video: u32,
    pub restaurant_name: String,
    pub confidence: Confidence,
    pub cuisine_type: String,
    pub location: Location,
    pub dishes_shown: Vec<String>,
    /// "MM:SS" timestamps where food is most clearly visible.
    pub food_shot_timestamps: Vec<String>,
    pub creator_rating_or_opinion: Option<String>,
    pub evidence: Vec<String>,
    pub notes: Option<String>,
    /// Object names of extracted frames, filled by frame extraction.
    #[serde(default)]
    pub food_images: Vec<String>,
    /// Filled by geocoding; stays null when resolution fails.
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// The persisted per-video envelope. Only written when at least one
/// restaurant was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub source_url: String,
    pub video_file: String,
    pub title: String,
    pub uploader: String,
    pub restaurants_found: u32,
    pub restaurants: Vec<RestaurantRecord>,
}

// --- Tracker ---

/// One tracker entry per distinct submitted URL. Overwritten wholesale on
/// a retry run, never edited field-by-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub filename: Option<String>,
    pub title: String,
    pub uploader: String,
    pub sender: String,
    pub chat: String,
    pub downloaded_at: DateTime<Utc>,
    pub category: Category,
    pub filter_result: FilterVerdict,
    #[serde(default)]
    pub restaurants_found: Option<u32>,
    #[serde(default)]
    pub analysis_file: Option<String>,
    #[serde(default)]
    pub analysis_error: Option<String>,
}

// --- Video metadata ---

/// Metadata for a video, from a metadata-only probe or the sidecar file
/// written alongside a download.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::SkippedNotRestaurant).unwrap();
        assert_eq!(json, "\"skipped_not_restaurant\"");
        assert_eq!(Category::AnalysisFailed.to_string(), "analysis_failed");
    }

    #[test]
    fn empty_location_detected() {
        assert!(Location::default().is_empty());
        let loc = Location {
            country: Some("Japan".to_string()),
            ..Default::default()
        };
        assert!(!loc.is_empty());
    }

    #[test]
    fn tracker_entry_round_trips() {
        let entry = TrackerEntry {
            filename: Some("123.mp4".to_string()),
            title: "best ramen".to_string(),
            uploader: "chef".to_string(),
            sender: "alice".to_string(),
            chat: "food club".to_string(),
            downloaded_at: Utc::now(),
            category: Category::Restaurant,
            filter_result: FilterVerdict::Likely,
            restaurants_found: Some(2),
            analysis_file: Some("123_analysis.json".to_string()),
            analysis_error: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: TrackerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.category, Category::Restaurant);
        assert_eq!(back.restaurants_found, Some(2));
    }

    #[test]
    fn restaurant_record_tolerates_missing_enrichment_fields() {
        let json = r#"{
            "order_in_video": 1,
            "restaurant_name": "Ramen Tatsuya",
            "confidence": "high",
            "cuisine_type": "Japanese",
            "location": {"city": "Austin", "country": "USA"},
            "dishes_shown": ["tonkotsu"],
            "food_shot_timestamps": ["00:12"],
            "creator_rating_or_opinion": null,
            "evidence": [],
            "notes": null
        }"#;
        let record: RestaurantRecord = serde_json::from_str(json).unwrap();
        assert!(record.food_images.is_empty());
        assert!(record.lat.is_none());
        assert_eq!(record.confidence, Confidence::High);
    }
}
