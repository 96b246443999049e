//! Error types for detection, extraction and spider generation.

use crate::carrier::{Platform, Step};

/// All errors that can occur while probing a site or generating a spider.
///
/// "Not found" is never an error: a missing store finder is reported as
/// `DetectionVerdict::NotDetected` or an empty record.
#[derive(thiserror::Error, Debug)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed {platform} response from {url}: {detail}")]
    MalformedResponse {
        platform: Platform,
        url: String,
        detail: String,
    },

    #[error("{platform} has no {step:?} continuation")]
    UnknownContinuation { platform: Platform, step: Step },

    #[error("Request chain exceeded {0} steps")]
    ChainTooLong(usize),

    #[error("Response from {0} carries no continuation")]
    MissingCarrier(String),

    #[error("Response from {0} resumed the wrong kind of chain")]
    CarrierMismatch(String),

    #[error("Platform not registered: {0}")]
    UnregisteredPlatform(Platform),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;

impl GeneratorError {
    /// Shorthand used by platform continuations when a response lacks the
    /// shape they expect.
    pub fn malformed(platform: Platform, url: &str, detail: impl Into<String>) -> Self {
        GeneratorError::MalformedResponse {
            platform,
            url: url.to_string(),
            detail: detail.into(),
        }
    }
}
