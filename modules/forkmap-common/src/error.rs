use thiserror::Error;

/// Failure taxonomy for one pipeline run. Metadata and download failures
/// abort the run with no tracker write; everything downstream of a
/// successful download still produces a persisted, categorized outcome.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Metadata extraction failed: {0}")]
    Metadata(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Frame extraction failed: {0}")]
    FrameExtraction(String),

    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error("Backup restore failed: {0}")]
    BackupRestore(String),

    #[error("Backup write failed: {0}")]
    BackupWrite(String),

    #[error("Aggregate rebuild failed: {0}")]
    Rebuild(String),

    #[error("Tracker store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
