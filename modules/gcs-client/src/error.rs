use thiserror::Error;

pub type Result<T> = std::result::Result<T, GcsError>;

#[derive(Debug, Error)]
pub enum GcsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Auth error: {0}")]
    Auth(String),
}

impl From<reqwest::Error> for GcsError {
    fn from(err: reqwest::Error) -> Self {
        GcsError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GcsError {
    fn from(err: serde_json::Error) -> Self {
        GcsError::Parse(err.to_string())
    }
}
