pub mod error;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::FileData;

use std::time::Duration;

use types::*;

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// How long to sleep between file-state polls. Video ingestion usually
/// finishes within a few polls.
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Upload raw media bytes to the Files API. The returned file is
    /// usually still `PROCESSING`; callers follow up with
    /// [`wait_for_active`](Self::wait_for_active).
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileData> {
        let url = format!("{}/upload/v1beta/files", self.base_url);

        let metadata = serde_json::json!({"file": {"display_name": display_name}});
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| GeminiError::Parse(e.to_string()))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .mime_str(mime_type)
                    .map_err(|e| GeminiError::Parse(e.to_string()))?,
            );

        let resp = self
            .client
            .post(&url)
            .query(&[("uploadType", "multipart"), ("key", &self.api_key)])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let upload: UploadResponse = resp.json().await?;
        tracing::info!(name = %upload.file.name, state = %upload.file.state, "Uploaded file to Gemini");
        Ok(upload.file)
    }

    /// Fetch the current state of an uploaded file.
    pub async fn get_file(&self, name: &str) -> Result<FileData> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let resp = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Poll until the file leaves `PROCESSING`. Returns the active file,
    /// or fails fast if the service reports any other terminal state.
    pub async fn wait_for_active(&self, file: FileData) -> Result<FileData> {
        let mut file = file;
        while file.is_processing() {
            tracing::debug!(name = %file.name, "File still processing, waiting");
            tokio::time::sleep(FILE_POLL_INTERVAL).await;
            file = self.get_file(&file.name).await?;
        }

        if !file.is_active() {
            return Err(GeminiError::FileFailed(file.state));
        }
        Ok(file)
    }

    /// Run a generation request over an uploaded file plus a text prompt,
    /// constrained to JSON output (optionally schema-constrained), and
    /// return the raw response text.
    pub async fn generate_json(
        &self,
        model: &str,
        file: &FileData,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let mime_type = file.mime_type.clone().unwrap_or_else(|| "video/mp4".to_string());
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::file(&file.uri, mime_type), Part::text(prompt)],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
            },
        };

        tracing::info!(model, file = %file.name, "Gemini generate request");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let response: GenerateResponse = resp.json().await?;
        response.text().ok_or(GeminiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_base_url_strips_trailing_slash() {
        let client = GeminiClient::new("test-key").with_base_url("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn file_state_predicates() {
        let processing = FileData {
            name: "files/abc".to_string(),
            uri: "https://example/files/abc".to_string(),
            state: "PROCESSING".to_string(),
            mime_type: None,
        };
        assert!(processing.is_processing());
        assert!(!processing.is_active());

        let failed = FileData {
            state: "FAILED".to_string(),
            ..processing
        };
        assert!(!failed.is_processing());
        assert!(!failed.is_active());
    }
}
