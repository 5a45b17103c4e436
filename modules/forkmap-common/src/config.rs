use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI analysis
    pub gemini_api_key: String,

    // Blob storage
    pub gcs_bucket: String,

    // Web server
    pub host: String,
    pub port: u16,

    // Local filesystem
    pub downloads_dir: PathBuf,
    pub tracker_path: PathBuf,

    // External tools
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,

    // When set, URLs whose previous run ended in analysis_failed are
    // re-admitted instead of treated as duplicates.
    pub retry_failed_analysis: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: required_env("GEMINI_API_KEY"),
            gcs_bucket: env::var("GCS_BUCKET")
                .unwrap_or_else(|_| "forkmap-restaurants".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()
                .expect("PORT must be a number"),
            downloads_dir: env::var("DOWNLOADS_DIR")
                .unwrap_or_else(|_| "/tmp/forkmap_videos".to_string())
                .into(),
            tracker_path: env::var("TRACKER_FILE")
                .unwrap_or_else(|_| "url_tracker.json".to_string())
                .into(),
            ytdlp_bin: env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string()),
            ffmpeg_bin: env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            retry_failed_analysis: env::var("RETRY_FAILED_ANALYSIS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
