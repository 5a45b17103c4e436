use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use forkmap_common::Config;
use forkmap_ingest::{
    FrameExtractor, GeminiAnalyzer, Geocoder, ObjectStore, Pipeline, UrlTracker, YtDlpFetcher,
};
use gemini_client::GeminiClient;
use nominatim_client::NominatimClient;

mod rest;

pub struct AppState {
    pub pipeline: Pipeline,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("forkmap=info".parse()?))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn ObjectStore> = Arc::new(gcs_client::GcsClient::new(&config.gcs_bucket));
    let geocoder = Geocoder::new(NominatimClient::new());
    let frames = FrameExtractor::new(store.clone(), &config.ffmpeg_bin);
    let analyzer = GeminiAnalyzer::new(
        GeminiClient::new(&config.gemini_api_key),
        store.clone(),
        geocoder,
        frames,
    );
    let fetcher = YtDlpFetcher::new(&config.ytdlp_bin, &config.downloads_dir);
    let tracker = Arc::new(UrlTracker::new(
        config.tracker_path.clone(),
        store.clone(),
        config.retry_failed_analysis,
    ));

    let pipeline = Pipeline::new(tracker, Arc::new(fetcher), Arc::new(analyzer), store);
    let state = Arc::new(AppState { pipeline });

    let app = Router::new()
        .route("/process", post(rest::process))
        .route("/health", get(rest::health))
        .with_state(state)
        // Logging layer: method + path only (submitted URLs stay out of spans)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!(downloads_dir = %config.downloads_dir.display(), "Forkmap ingestion service starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
