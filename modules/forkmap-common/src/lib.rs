pub mod config;
pub mod error;
pub mod filter;
pub mod types;
pub mod url;

pub use config::Config;
pub use error::PipelineError;
pub use filter::relevance;
pub use types::*;
pub use url::normalize_url;
