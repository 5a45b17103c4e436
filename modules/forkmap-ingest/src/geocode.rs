//! Address resolution for analysis records.
//!
//! Builds a Nominatim query from the location fields the analysis
//! reported, most specific first. When the full query finds nothing, one
//! broader retry with just city + country is allowed; after that the
//! record keeps null coordinates. Failures here never abort a pipeline
//! run.

use forkmap_common::{Coordinates, Location, PipelineError};
use nominatim_client::NominatimClient;
use tracing::{info, warn};

/// Primary query: every present field, joined most specific to least.
pub fn build_query(location: &Location) -> Option<String> {
    let fields = [
        &location.specific_address,
        &location.neighborhood,
        &location.city,
        &location.state_or_region,
        &location.country,
    ];

    let parts: Vec<&str> = fields
        .iter()
        .filter_map(|f| f.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Broader retry: city + country only. Requires both fields, and is
/// skipped when it would repeat the primary query.
pub fn build_fallback_query(location: &Location, primary: &str) -> Option<String> {
    let city = location
        .city
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let country = location
        .country
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    let query = format!("{city}, {country}");
    if query == primary {
        None
    } else {
        Some(query)
    }
}

pub struct Geocoder {
    client: NominatimClient,
}

impl Geocoder {
    pub fn new(client: NominatimClient) -> Self {
        Self { client }
    }

    /// Resolve a location to coordinates. Every failure mode (no usable
    /// fields, no results, network error, timeout) degrades to `None`.
    pub async fn resolve(&self, location: &Location) -> Option<Coordinates> {
        let query = build_query(location)?;

        match self.search(&query).await {
            Ok(Some(coords)) => return Some(coords),
            Ok(None) => {}
            Err(e) => {
                warn!(query, error = %e, "Geocoding request failed");
                return None;
            }
        }

        let fallback = build_fallback_query(location, &query)?;
        info!(query, fallback, "No geocoding result, trying broader query");

        match self.search(&fallback).await {
            Ok(Some(coords)) => Some(coords),
            Ok(None) => {
                info!(query, "No geocoding results");
                None
            }
            Err(e) => {
                warn!(fallback, error = %e, "Geocoding fallback request failed");
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Option<Coordinates>, PipelineError> {
        let hit = self
            .client
            .search(query)
            .await
            .map_err(|e| PipelineError::Geocoding(e.to_string()))?;
        Ok(hit.map(|(lat, lng)| Coordinates { lat, lng }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(
        address: Option<&str>,
        neighborhood: Option<&str>,
        city: Option<&str>,
        region: Option<&str>,
        country: Option<&str>,
    ) -> Location {
        Location {
            specific_address: address.map(String::from),
            neighborhood: neighborhood.map(String::from),
            city: city.map(String::from),
            state_or_region: region.map(String::from),
            country: country.map(String::from),
        }
    }

    #[test]
    fn query_orders_most_specific_first() {
        let loc = location(
            Some("1234 S Lamar Blvd"),
            Some("Zilker"),
            Some("Austin"),
            Some("Texas"),
            Some("USA"),
        );
        assert_eq!(
            build_query(&loc).as_deref(),
            Some("1234 S Lamar Blvd, Zilker, Austin, Texas, USA")
        );
    }

    #[test]
    fn country_only_query_uses_just_that_field() {
        let loc = location(None, None, None, None, Some("Japan"));
        assert_eq!(build_query(&loc).as_deref(), Some("Japan"));
    }

    #[test]
    fn empty_location_builds_no_query() {
        assert!(build_query(&Location::default()).is_none());
    }

    #[test]
    fn blank_fields_are_ignored() {
        let loc = location(Some("  "), None, Some("Austin"), None, None);
        assert_eq!(build_query(&loc).as_deref(), Some("Austin"));
    }

    #[test]
    fn fallback_requires_city_and_country() {
        let city_only = location(Some("addr"), None, Some("Austin"), None, None);
        let primary = build_query(&city_only).unwrap();
        assert!(build_fallback_query(&city_only, &primary).is_none());

        let country_only = location(Some("addr"), None, None, None, Some("USA"));
        let primary = build_query(&country_only).unwrap();
        assert!(build_fallback_query(&country_only, &primary).is_none());
    }

    #[test]
    fn fallback_skipped_when_identical_to_primary() {
        let loc = location(None, None, Some("Austin"), None, Some("USA"));
        let primary = build_query(&loc).unwrap();
        assert_eq!(primary, "Austin, USA");
        assert!(build_fallback_query(&loc, &primary).is_none());
    }

    #[test]
    fn fallback_built_when_broader_than_primary() {
        let loc = location(
            Some("1234 S Lamar Blvd"),
            None,
            Some("Austin"),
            None,
            Some("USA"),
        );
        let primary = build_query(&loc).unwrap();
        assert_eq!(
            build_fallback_query(&loc, &primary).as_deref(),
            Some("Austin, USA")
        );
    }

    #[tokio::test]
    async fn empty_location_resolves_to_none_without_network() {
        // Unroutable base URL: any request would error loudly. An empty
        // location must return before the client is touched.
        let client = NominatimClient::new()
            .with_base_url("http://127.0.0.1:1")
            .with_min_interval(std::time::Duration::ZERO);
        let geocoder = Geocoder::new(client);

        assert!(geocoder.resolve(&Location::default()).await.is_none());
    }
}
