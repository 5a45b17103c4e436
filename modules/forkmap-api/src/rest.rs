use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{error, warn};

use forkmap_common::PipelineError;
use forkmap_ingest::{ProcessOutcome, Submission};

use crate::AppState;

#[derive(Deserialize)]
pub struct ProcessRequest {
    url: Option<String>,
    #[serde(default)]
    chat_name: String,
    #[serde(default)]
    sender: String,
}

/// Validate a submitted URL: parseable, http(s), bounded length.
/// Returns the trimmed URL or a caller-facing rejection message.
pub fn validate_url(raw: &str) -> Result<String, &'static str> {
    let url = raw.trim();
    if url.is_empty() {
        return Err("Missing url field");
    }
    if url.len() > 2048 {
        return Err("URL too long (max 2048 characters)");
    }
    let parsed = url::Url::parse(url).map_err(|_| "Invalid URL")?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err("URL must use http or https scheme");
    }
    Ok(url.to_string())
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"status": "error", "message": message})),
    )
        .into_response()
}

/// Full pipeline for one submitted URL: dedup check → metadata probe →
/// keyword filter → download → analysis → persistence.
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProcessRequest>,
) -> Response {
    let Some(raw_url) = body.url else {
        return bad_request("Missing url field");
    };
    let url = match validate_url(&raw_url) {
        Ok(url) => url,
        Err(message) => return bad_request(message),
    };

    let submission = Submission {
        url,
        chat_name: body.chat_name,
        sender: body.sender,
    };

    match state.pipeline.run(&submission).await {
        Ok(ProcessOutcome::Skipped {
            message,
            title,
            filter_result,
        }) => {
            let mut payload = serde_json::json!({
                "status": "skipped",
                "message": message,
            });
            if let Some(title) = title {
                payload["title"] = serde_json::json!(title);
            }
            if let Some(verdict) = filter_result {
                payload["filter_result"] = serde_json::json!(verdict);
            }
            (StatusCode::OK, Json(payload)).into_response()
        }

        Ok(ProcessOutcome::Completed {
            category,
            message,
            filename,
            title,
            filter_result,
            restaurants_found,
            analysis,
        }) => {
            let restaurants = analysis.map(|a| a.restaurants).unwrap_or_default();
            let payload = serde_json::json!({
                "status": "success",
                "category": category,
                "message": message,
                "filename": filename,
                "title": title,
                "filter_result": filter_result,
                "restaurants_found": restaurants_found,
                "analysis": restaurants,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }

        // Metadata and download are the two stages with no in-band
        // failure category; nothing was recorded, so the caller may
        // legitimately resubmit later.
        Err(e @ (PipelineError::Metadata(_) | PipelineError::Download(_))) => {
            warn!(url = %submission.url, error = %e, "Pipeline rejected submission");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }

        Err(e) => {
            error!(url = %submission.url, error = %e, "Pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Tracker summary: total entries and per-category counts.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.tracker().summary().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "total_entries": summary.total_entries,
                "categories": summary.categories,
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Health check failed to read tracker");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}
