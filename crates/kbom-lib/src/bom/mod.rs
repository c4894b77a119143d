//! CycloneDX 1.5 bill of materials
//!
//! [`assemble`] turns a [`Snapshot`](crate::models::Snapshot) into a [`Bom`]:
//! the cluster as metadata component, one component per node, image and
//! resource, and a single dependency entry from the cluster to its nodes
//! and control-plane images. The encoders in [`crate::encode`] write it out
//! as JSON or XML.

mod assembler;
mod properties;

pub use assembler::assemble;
pub use properties::{PropertyList, CDX_PREFIX, VENDOR_PREFIX};

use serde::Serialize;

pub const BOM_FORMAT: &str = "CycloneDX";
pub const SPEC_VERSION: &str = "1.5";

/// Root of a CycloneDX document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bom {
    pub bom_format: String,
    pub spec_version: String,
    /// `urn:uuid:` form of the run identifier
    pub serial_number: String,
    pub version: u32,
    pub metadata: Metadata,
    pub components: Vec<Component>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// RFC 3339, second precision
    pub timestamp: String,
    pub tools: Vec<Tool>,
    pub component: Component,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

/// CycloneDX component classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Platform,
    Container,
    Application,
}

impl ComponentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Platform => "platform",
            ComponentType::Container => "container",
            ComponentType::Application => "application",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    /// Absent when no reference could be minted
    #[serde(rename = "bom-ref", skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    pub properties: PropertyList,
}

/// A component and the references it depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "ref")]
    pub reference: String,
    pub depends_on: Vec<String>,
}
