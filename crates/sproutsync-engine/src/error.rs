use thiserror::Error;

/// Failure reported by a [`crate::DocumentStore`] call.
///
/// The rendered message is what [`crate::ErrorClass::of`] inspects, so store
/// implementations should keep the vendor's error text intact.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Failure reported by a [`crate::AnalyticsSource`] call.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("analytics request failed: {0}")]
    Request(String),

    #[error("analytics response could not be decoded: {0}")]
    Decode(String),
}

/// Failure to obtain or refresh an access token.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("credential provider rejected the request: {0}")]
    Rejected(String),

    #[error("credential provider unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// The retry budget ran out; carries the last store error.
    #[error("{label} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        label: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("could not locate document matching '{pattern}': {source}")]
    Locate {
        pattern: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    /// An earlier group in the same run already owns this title.
    #[error("document title '{pattern}' is already claimed by an earlier group in this run")]
    DuplicateTitle { pattern: String },

    #[error("upstream returned no usable analytics for group '{group}'")]
    NoUsableData { group: String },

    #[error("sub-sections could not be ensured: {}", .names.join(", "))]
    MissingSubsections { names: Vec<String> },

    #[error("{failed} of {attempted} sub-section writes failed")]
    PartialWrite { failed: usize, attempted: usize },
}
