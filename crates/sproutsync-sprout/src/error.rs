use sproutsync_engine::SourceError;
use thiserror::Error;

/// Errors returned by the Sprout API client.
#[derive(Debug, Error)]
pub enum SproutError {
    /// Network or TLS failure, or a non-2xx status, from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The client was configured with an unusable base URL or token.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl From<SproutError> for SourceError {
    fn from(err: SproutError) -> Self {
        match err {
            SproutError::Deserialize { .. } => SourceError::Decode(err.to_string()),
            SproutError::Http(_) | SproutError::InvalidConfig(_) => {
                SourceError::Request(err.to_string())
            }
        }
    }
}
