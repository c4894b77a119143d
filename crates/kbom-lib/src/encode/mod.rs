//! Document encoders
//!
//! Four output formats share one snapshot: the native document as JSON or
//! YAML, and the CycloneDX document as JSON or XML. Lookup goes through the
//! [`FORMATS`] table.

mod cyclonedx_json;
mod cyclonedx_xml;
mod native;

use crate::bom::assemble;
use crate::error::{KbomError, Result};
use crate::models::Snapshot;
use std::fmt;

/// An output format and the file extension it is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub name: &'static str,
    pub extension: &'static str,
    kind: FormatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatKind {
    Json,
    Yaml,
    CycloneDxJson,
    CycloneDxXml,
}

pub const JSON: Format = Format {
    name: "json",
    extension: "json",
    kind: FormatKind::Json,
};

pub const YAML: Format = Format {
    name: "yaml",
    extension: "yaml",
    kind: FormatKind::Yaml,
};

pub const CYCLONEDX_JSON: Format = Format {
    name: "cyclonedx-json",
    extension: "json",
    kind: FormatKind::CycloneDxJson,
};

pub const CYCLONEDX_XML: Format = Format {
    name: "cyclonedx-xml",
    extension: "xml",
    kind: FormatKind::CycloneDxXml,
};

/// Every supported format, in the order they are listed to users
pub const FORMATS: [Format; 4] = [JSON, YAML, CYCLONEDX_JSON, CYCLONEDX_XML];

impl Format {
    /// Look up a format by its exact name
    pub fn from_name(name: &str) -> Result<Format> {
        FORMATS
            .iter()
            .copied()
            .find(|format| format.name == name)
            .ok_or_else(|| KbomError::UnsupportedFormat(name.to_string()))
    }

    /// Names of all formats, for help text
    pub fn names() -> Vec<&'static str> {
        FORMATS.iter().map(|format| format.name).collect()
    }

    /// Encode a snapshot, assembling the CycloneDX document when needed
    pub fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        match self.kind {
            FormatKind::Json => native::to_json(snapshot),
            FormatKind::Yaml => native::to_yaml(snapshot),
            FormatKind::CycloneDxJson => cyclonedx_json::to_json(&assemble(snapshot)),
            FormatKind::CycloneDxXml => cyclonedx_xml::to_xml(&assemble(snapshot)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) fn encoding_failed(e: impl fmt::Display) -> KbomError {
    KbomError::EncodingFailed(e.to_string())
}
