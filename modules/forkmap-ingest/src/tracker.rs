//! Dedup/state tracker.
//!
//! A persisted map from raw submitted URL to processing outcome, the
//! single source of truth for "has this URL been handled". The primary
//! copy is a local JSON file; every save is mirrored best-effort to the
//! object store, and a cold start with no local file restores from that
//! backup once. All reads and writes go through one mutex, so concurrent
//! submissions cannot interleave load/save and lose entries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use forkmap_common::{normalize_url, Category, PipelineError, TrackerEntry};

use crate::traits::ObjectStore;

/// Backup object path in the store.
pub const BACKUP_OBJECT: &str = "state/url_tracker.json";

/// Tracker contents summarized for the health endpoint.
#[derive(Debug, Clone)]
pub struct TrackerSummary {
    pub total_entries: usize,
    pub categories: HashMap<String, usize>,
}

struct TrackerState {
    entries: HashMap<String, TrackerEntry>,
    loaded: bool,
}

pub struct UrlTracker {
    local_path: PathBuf,
    store: Arc<dyn ObjectStore>,
    retry_failed_analysis: bool,
    state: Mutex<TrackerState>,
}

impl UrlTracker {
    pub fn new(local_path: PathBuf, store: Arc<dyn ObjectStore>, retry_failed_analysis: bool) -> Self {
        Self {
            local_path,
            store,
            retry_failed_analysis,
            state: Mutex::new(TrackerState {
                entries: HashMap::new(),
                loaded: false,
            }),
        }
    }

    /// True iff an equivalent URL has already been processed. Entries in
    /// `analysis_failed` are re-admitted when the retry policy allows it.
    pub async fn is_duplicate(&self, url: &str) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let normalized = normalize_url(url);
        Ok(state.entries.iter().any(|(tracked, entry)| {
            if normalize_url(tracked) != normalized {
                return false;
            }
            !(self.retry_failed_analysis && entry.category == Category::AnalysisFailed)
        }))
    }

    /// Insert or overwrite the entry for a URL and persist the whole map:
    /// local file first (fatal on failure), then the backup mirror
    /// (logged on failure).
    pub async fn record(&self, url: &str, entry: TrackerEntry) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        state.entries.insert(url.to_string(), entry);
        self.save_local(&state.entries).await?;

        if let Err(e) = self.mirror_to_backup(&state.entries).await {
            warn!(error = %e, "Tracker backup failed");
        }
        Ok(())
    }

    /// Entry count and per-category breakdown.
    pub async fn summary(&self) -> Result<TrackerSummary, PipelineError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut categories: HashMap<String, usize> = HashMap::new();
        for entry in state.entries.values() {
            *categories.entry(entry.category.to_string()).or_default() += 1;
        }
        Ok(TrackerSummary {
            total_entries: state.entries.len(),
            categories,
        })
    }

    /// Populate the in-memory map on first access: local file if present,
    /// else a one-time restore from the backup, else empty.
    async fn ensure_loaded(&self, state: &mut TrackerState) -> Result<(), PipelineError> {
        if state.loaded {
            return Ok(());
        }

        match tokio::fs::read(&self.local_path).await {
            Ok(bytes) => {
                state.entries = serde_json::from_slice(&bytes).map_err(|e| {
                    PipelineError::Store(format!(
                        "corrupt tracker file {}: {e}",
                        self.local_path.display()
                    ))
                })?;
                info!(
                    path = %self.local_path.display(),
                    entries = state.entries.len(),
                    "Loaded tracker"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match self.restore_from_backup().await {
                    Ok(Some(entries)) => {
                        info!(entries = entries.len(), "Restored tracker from backup");
                        if let Err(e) = self.save_local(&entries).await {
                            warn!(error = %e, "Could not write restored tracker locally");
                        }
                        state.entries = entries;
                    }
                    Ok(None) => {
                        info!("No tracker found locally or in backup, starting empty");
                    }
                    Err(e) => {
                        warn!(error = %e, "Tracker restore failed, starting empty");
                    }
                }
            }
            Err(e) => {
                return Err(PipelineError::Store(format!(
                    "cannot read tracker file {}: {e}",
                    self.local_path.display()
                )));
            }
        }

        state.loaded = true;
        Ok(())
    }

    async fn restore_from_backup(
        &self,
    ) -> Result<Option<HashMap<String, TrackerEntry>>, PipelineError> {
        let value = self
            .store
            .get_json(BACKUP_OBJECT)
            .await
            .map_err(|e| PipelineError::BackupRestore(e.to_string()))?;
        match value {
            Some(value) => {
                let entries = serde_json::from_value(value)
                    .map_err(|e| PipelineError::BackupRestore(format!("corrupt backup: {e}")))?;
                Ok(Some(entries))
            }
            None => Ok(None),
        }
    }

    async fn save_local(&self, entries: &HashMap<String, TrackerEntry>) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| PipelineError::Store(e.to_string()))?;
        tokio::fs::write(&self.local_path, bytes).await.map_err(|e| {
            PipelineError::Store(format!(
                "cannot write tracker file {}: {e}",
                self.local_path.display()
            ))
        })
    }

    async fn mirror_to_backup(
        &self,
        entries: &HashMap<String, TrackerEntry>,
    ) -> Result<(), PipelineError> {
        let value =
            serde_json::to_value(entries).map_err(|e| PipelineError::BackupWrite(e.to_string()))?;
        self.store
            .put_json(BACKUP_OBJECT, &value)
            .await
            .map_err(|e| PipelineError::BackupWrite(e.to_string()))
    }
}
