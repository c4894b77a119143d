//! Structured logging for run-level events
//!
//! Every event carries an `event` field and the run identifier so the log
//! lines of one invocation can be picked out of a shared log stream.

use crate::error::KbomError;
use std::time::Duration;
use tracing::{debug, info};

/// Structured logger for one collection run
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
}

impl RunLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    /// Log the start of a collection run
    pub fn log_collection_started(&self, cluster: &str, mode: &str) {
        info!(
            event = "collection_started",
            run_id = %self.run_id,
            cluster = %cluster,
            mode = %mode,
            "Collecting cluster inventory"
        );
    }

    /// Log the end of a collection run
    pub fn log_collection_finished(
        &self,
        nodes: usize,
        images: usize,
        resource_kinds: usize,
        elapsed: Duration,
    ) {
        info!(
            event = "collection_finished",
            run_id = %self.run_id,
            nodes = nodes,
            images = images,
            resource_kinds = resource_kinds,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cluster inventory collected"
        );
    }

    /// Log a resource kind or namespace left out after a listing failure
    pub fn log_listing_skipped(&self, error: &KbomError) {
        debug!(
            event = "listing_skipped",
            run_id = %self.run_id,
            error = %error,
            "Failed to list resources, skipping"
        );
    }

    /// Log a document handed to its output sink
    pub fn log_document_written(&self, format: &str, destination: &str, bytes: usize) {
        info!(
            event = "document_written",
            run_id = %self.run_id,
            format = %format,
            destination = %destination,
            bytes = bytes,
            "BOM document written"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_without_subscriber_is_harmless() {
        let logger = RunLogger::new("run");
        logger.log_collection_started("kind-kind", "full");
        logger.log_listing_skipped(&KbomError::ResourceListingFailed {
            gvr: "/v1, Resource=secrets".to_string(),
            reason: "forbidden".to_string(),
        });
        logger.log_collection_finished(2, 1, 1, Duration::from_millis(5));
        logger.log_document_written("json", "stdout", 42);
    }
}
