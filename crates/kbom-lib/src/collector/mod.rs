//! Cluster inventory collection
//!
//! The [`Collector`] walks a [`ClusterSource`] top-down and builds the
//! [`Snapshot`] for one run: metadata, nodes, location, images, then the
//! resource catalog. Everything except resource listing is fatal on error.

mod config;
mod images;
mod metadata;
mod nodes;
mod resources;


pub use config::{Filters, Mode, RunConfig};
pub use metadata::{ca_cert_digest, normalize_version};

use crate::error::{KbomError, Result};
use crate::models::{Cluster, Components, Snapshot, BOM_FORMAT, SPEC_VERSION};
use crate::observability::RunLogger;
use crate::source::ClusterSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Builds a [`Snapshot`] from a cluster data source
pub struct Collector {
    source: Arc<dyn ClusterSource>,
    config: RunConfig,
    logger: RunLogger,
}

impl Collector {
    pub fn new(source: Arc<dyn ClusterSource>, config: RunConfig) -> Self {
        let logger = RunLogger::new(config.run_id.to_string());
        Self {
            source,
            config,
            logger,
        }
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Run one full collection pass
    pub async fn collect(&self) -> Result<Snapshot> {
        let start = Instant::now();
        let cluster_name = self.source.cluster_name();
        self.logger
            .log_collection_started(&cluster_name, self.config.mode.as_str());

        let (k8s_version, ca_cert_digest) = self.metadata().await?;
        let nodes = self.nodes().await?;
        let location = self.location().await?;
        let images = self.images().await?;
        let resources = self.resources().await?;

        self.logger.log_collection_finished(
            nodes.len(),
            images.len(),
            resources.len(),
            start.elapsed(),
        );

        Ok(Snapshot {
            id: self.config.run_id.to_string(),
            bom_format: BOM_FORMAT.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            generated_at: self.config.generated_at,
            generated_by: self.config.tool.clone(),
            cluster: Cluster {
                name: cluster_name,
                ca_cert_digest,
                k8s_version,
                location: Some(location),
                nodes_count: nodes.len(),
                nodes,
                components: Components { images, resources },
            },
        })
    }

    /// Await one cluster call under the request timeout.
    ///
    /// The outer result is the timeout, the inner one the call itself.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<anyhow::Result<T>>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        debug!(operation = operation, "Querying cluster");
        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| KbomError::Timeout {
                operation,
                timeout: self.config.request_timeout,
            })
    }
}

/// Render a data source error with its whole context chain
fn query_error(operation: &'static str, err: anyhow::Error) -> KbomError {
    KbomError::ClusterQuery {
        operation,
        reason: format!("{:#}", err),
    }
}
