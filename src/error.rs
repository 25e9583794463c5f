//! Service-level error taxonomy and its REST mapping.

use http::StatusCode;

use crate::interfaces::StorageError;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, HiscoreError>;

/// Errors surfaced by the hiscore services.
#[derive(Debug, thiserror::Error)]
pub enum HiscoreError {
    /// No snapshot matched the lookup.
    #[error("snapshot not found")]
    SnapshotNotFound,

    /// No delta matched the lookup.
    #[error("delta not found")]
    DeltaNotFound,

    /// No snapshot exists to anchor a delta summary.
    #[error("no baseline snapshot for user {user_id}")]
    NoBaseline { user_id: String },

    /// Snapshot failed structural validation.
    #[error("invalid snapshot: {0}")]
    Validation(String),

    /// Malformed or oversized time range.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Aggregation window too fine for the requested span.
    #[error("invalid aggregation window: {0}")]
    InvalidAggregationWindow(String),

    /// Any underlying store failure.
    #[error("store error: {0}")]
    Storage(#[from] StorageError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl HiscoreError {
    /// HTTP status the REST layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            HiscoreError::Validation(_)
            | HiscoreError::InvalidInterval(_)
            | HiscoreError::InvalidAggregationWindow(_) => StatusCode::BAD_REQUEST,
            HiscoreError::SnapshotNotFound
            | HiscoreError::DeltaNotFound
            | HiscoreError::NoBaseline { .. } => StatusCode::NOT_FOUND,
            HiscoreError::Storage(_) | HiscoreError::Cancelled => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Structured error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            HiscoreError::Validation(_) => "INVALID_SNAPSHOT",
            HiscoreError::InvalidInterval(_) => "BAD_REQUEST",
            HiscoreError::InvalidAggregationWindow(_) => "INVALID_AGGREGATION_WINDOW",
            HiscoreError::SnapshotNotFound | HiscoreError::NoBaseline { .. } => {
                "SNAPSHOT_NOT_FOUND"
            }
            HiscoreError::DeltaNotFound => "DELTA_NOT_FOUND",
            HiscoreError::Storage(_) | HiscoreError::Cancelled => "INTERNAL_SERVICE_ERROR",
        }
    }

    /// Message safe to show to clients. Server errors carry no internal detail.
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "an internal error occurred".to_string()
        } else {
            self.to_string()
        }
    }

    /// JSON body for the REST layer: `{"code": ..., "message": ...}`.
    pub fn error_body(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.public_message(),
        })
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    /// Maps a store not-found into `not_found`, wrapping anything else.
    pub(crate) fn from_lookup(err: StorageError, not_found: HiscoreError) -> Self {
        if err.is_not_found() {
            not_found
        } else {
            HiscoreError::Storage(err)
        }
    }
}
