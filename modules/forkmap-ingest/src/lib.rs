pub mod aggregate;
pub mod analyzer;
pub mod fetcher;
pub mod frames;
pub mod geocode;
pub mod pipeline;
pub mod tracker;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use analyzer::GeminiAnalyzer;
pub use fetcher::YtDlpFetcher;
pub use frames::FrameExtractor;
pub use geocode::Geocoder;
pub use pipeline::{Pipeline, ProcessOutcome, Submission};
pub use tracker::{TrackerSummary, UrlTracker};
pub use traits::{FetchedVideo, ObjectStore, VideoAnalyzer, VideoFetcher};
