//! Kubernetes bill-of-materials library
//!
//! This crate provides the core functionality for:
//! - Cluster inventory collection (nodes, images, API resources)
//! - Image reference normalization and digest recovery
//! - Content fingerprints for stable component references
//! - CycloneDX assembly and document encoding
//! - Output sinks and run-level structured logging

pub mod bom;
pub mod collector;
pub mod encode;
pub mod error;
pub mod fingerprint;
pub mod image;
pub mod models;
pub mod observability;
pub mod output;
pub mod schema;
pub mod source;

pub use collector::{Collector, Filters, Mode, RunConfig};
pub use encode::Format;
pub use error::{KbomError, Result};
pub use models::*;
pub use observability::RunLogger;
pub use output::{Output, OutputSink};
pub use source::{ClusterSource, FixtureCluster, KubeSource};
