//! Aggregate dataset rebuild.
//!
//! Recombines every persisted analysis envelope into one public
//! `restaurants.json`: a flat list of geocoded restaurants annotated with
//! their source video. Full rescan on every call, so the operation is
//! idempotent and self-healing; restaurants without coordinates and
//! unreadable envelopes are skipped.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use forkmap_common::{AnalysisResult, Confidence, Location, PipelineError};

use crate::traits::ObjectStore;

pub const AGGREGATE_OBJECT: &str = "restaurants.json";

const ENVELOPE_PREFIX: &str = "analysis_results/";
const ENVELOPE_SUFFIX: &str = "_analysis.json";

/// One row of the public dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRestaurant {
    pub name: String,
    pub cuisine: String,
    pub confidence: Confidence,
    pub location: Location,
    pub lat: f64,
    pub lng: f64,
    pub dishes: Vec<String>,
    pub food_images: Vec<String>,
    pub rating: Option<String>,
    pub notes: Option<String>,
    pub source_url: String,
    pub video_title: String,
    pub uploader: String,
}

/// Rebuild and upload the aggregate dataset. Returns the row count.
pub async fn rebuild(store: &dyn ObjectStore) -> Result<usize, PipelineError> {
    let names = store
        .list(ENVELOPE_PREFIX)
        .await
        .map_err(|e| PipelineError::Rebuild(e.to_string()))?;

    let mut envelopes: Vec<String> = names
        .into_iter()
        .filter(|n| n.ends_with(ENVELOPE_SUFFIX))
        .collect();
    envelopes.sort();

    let mut rows = Vec::new();
    for name in envelopes {
        let value = match store.get_json(&name).await {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(e) => {
                warn!(object = %name, error = %e, "Skipping unreadable envelope");
                continue;
            }
        };

        let envelope: AnalysisResult = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(object = %name, error = %e, "Skipping malformed envelope");
                continue;
            }
        };

        let AnalysisResult {
            source_url,
            title,
            uploader,
            restaurants,
            ..
        } = envelope;

        for restaurant in restaurants {
            let (Some(lat), Some(lng)) = (restaurant.lat, restaurant.lng) else {
                continue;
            };
            rows.push(MapRestaurant {
                name: restaurant.restaurant_name,
                cuisine: restaurant.cuisine_type,
                confidence: restaurant.confidence,
                location: restaurant.location,
                lat,
                lng,
                dishes: restaurant.dishes_shown,
                food_images: restaurant.food_images,
                rating: restaurant.creator_rating_or_opinion,
                notes: restaurant.notes,
                source_url: source_url.clone(),
                video_title: title.clone(),
                uploader: uploader.clone(),
            });
        }
    }

    let count = rows.len();
    let value = serde_json::to_value(&rows).map_err(|e| PipelineError::Rebuild(e.to_string()))?;
    store
        .put_json(AGGREGATE_OBJECT, &value)
        .await
        .map_err(|e| PipelineError::Rebuild(e.to_string()))?;

    info!(count, "Uploaded aggregate dataset");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{envelope_with, restaurant_named, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn keeps_only_geocoded_restaurants_with_provenance() {
        let store = Arc::new(MemoryStore::new());

        let mut geocoded = restaurant_named("Ramen Tatsuya");
        geocoded.lat = Some(30.25);
        geocoded.lng = Some(-97.75);
        let ungeocode = restaurant_named("Mystery Spot");

        let envelope = envelope_with(
            "https://tiktok.com/@chef/video/123",
            vec![geocoded, ungeocode],
        );
        store.seed_json(
            "analysis_results/123_analysis.json",
            serde_json::to_value(&envelope).unwrap(),
        );

        let count = rebuild(store.as_ref()).await.unwrap();
        assert_eq!(count, 1);

        let dataset = store.get_object(AGGREGATE_OBJECT).unwrap();
        let rows: Vec<MapRestaurant> = serde_json::from_value(dataset).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ramen Tatsuya");
        assert_eq!(rows[0].source_url, "https://tiktok.com/@chef/video/123");
        assert_eq!(rows[0].video_title, envelope.title);
    }

    #[tokio::test]
    async fn skips_malformed_envelopes() {
        let store = Arc::new(MemoryStore::new());
        store.seed_json(
            "analysis_results/bad_analysis.json",
            serde_json::json!({"not": "an envelope"}),
        );

        let mut geocoded = restaurant_named("Good Spot");
        geocoded.lat = Some(1.0);
        geocoded.lng = Some(2.0);
        store.seed_json(
            "analysis_results/ok_analysis.json",
            serde_json::to_value(&envelope_with("https://a/1", vec![geocoded])).unwrap(),
        );

        let count = rebuild(store.as_ref()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn ignores_non_envelope_objects() {
        let store = Arc::new(MemoryStore::new());
        store.seed_json(
            "analysis_results/123_1_1.jpg",
            serde_json::json!("not even close"),
        );

        let count = rebuild(store.as_ref()).await.unwrap();
        assert_eq!(count, 0);
        assert!(store.get_object(AGGREGATE_OBJECT).is_some());
    }
}
