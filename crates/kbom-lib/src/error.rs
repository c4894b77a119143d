//! Error types for collection, assembly and encoding

use std::time::Duration;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, KbomError>;

/// Errors raised while building or writing a bill of materials
///
/// Everything except [`KbomError::ResourceListingFailed`] is fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum KbomError {
    /// A container image reference could not be parsed
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Server version or CA data could not be obtained
    #[error("cluster metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The cluster reported no nodes
    #[error("no node found")]
    NoNodesFound,

    /// Listing one resource kind failed; the kind is skipped
    #[error("failed to list resources {gvr}: {reason}")]
    ResourceListingFailed { gvr: String, reason: String },

    /// A fatal query against the cluster data source failed
    #[error("failed to {operation}: {reason}")]
    ClusterQuery {
        operation: &'static str,
        reason: String,
    },

    /// A cluster call exceeded the request timeout
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("format {0:?} is not supported")]
    UnsupportedFormat(String),

    #[error("output {0:?} is not supported")]
    UnsupportedOutput(String),

    /// Serialization of the document or writing it to the sink failed
    #[error("failed to encode document: {0}")]
    EncodingFailed(String),
}

impl KbomError {
    /// Whether the run may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KbomError::ResourceListingFailed { .. })
    }
}
