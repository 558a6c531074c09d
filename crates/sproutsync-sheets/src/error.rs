use sproutsync_engine::{AuthError, StoreError};
use thiserror::Error;

/// Errors returned by the Google Drive, Sheets and OAuth clients.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with a non-2xx status. `message` is Google's own text
    /// so callers can classify quota and auth failures from it.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The spreadsheet has no sheet with this title.
    #[error("Unable to parse range: sheet '{0}' not found")]
    MissingSubsection(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl From<GoogleError> for StoreError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Api { status, message } => StoreError::Status { status, message },
            GoogleError::MissingSubsection(_) => StoreError::Status {
                status: 400,
                message: err.to_string(),
            },
            GoogleError::Http(e) => StoreError::Transport(e.to_string()),
            GoogleError::Deserialize { .. } | GoogleError::InvalidConfig(_) => {
                StoreError::Decode(err.to_string())
            }
        }
    }
}

impl From<GoogleError> for AuthError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Http(e) => AuthError::Transport(e.to_string()),
            GoogleError::Api { status, .. } if status >= 500 => {
                AuthError::Transport(err.to_string())
            }
            other => AuthError::Rejected(other.to_string()),
        }
    }
}
