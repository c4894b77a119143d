//! Namespaced component properties

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// Prefix for properties from the CycloneDX Kubernetes taxonomy
pub const CDX_PREFIX: &str = "cdx:";

/// Prefix for properties specific to this tool
pub const VENDOR_PREFIX: &str = "kbom:";

pub(crate) const COMPONENT_TYPE: &str = "k8s:component:type";
pub(crate) const COMPONENT_NAME: &str = "k8s:component:name";

/// Ordered `(name, value)` pairs; insertion order is kept on output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyList {
    entries: Vec<(String, String)>,
}

impl PropertyList {
    /// Start a list with the type and name every component carries
    pub fn for_component(component_type: &str, name: &str) -> Self {
        Self::default()
            .generic(COMPONENT_TYPE, component_type)
            .generic(COMPONENT_NAME, name)
    }

    /// Append a `cdx:` property
    pub fn generic(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((format!("{}{}", CDX_PREFIX, key), value.into()));
        self
    }

    /// Append a `kbom:` property
    pub fn vendor(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((format!("{}{}", VENDOR_PREFIX, key), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of the first property with the given full name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize)]
struct Property<'a> {
    name: &'a str,
    value: &'a str,
}

impl Serialize for PropertyList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (name, value) in self.iter() {
            seq.serialize_element(&Property { name, value })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_and_order() {
        let props = PropertyList::for_component("node", "node-1")
            .vendor("k8s:node:arch", "amd64")
            .vendor("k8s:node:kernel", "5.15.0");

        let names: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "cdx:k8s:component:type",
                "cdx:k8s:component:name",
                "kbom:k8s:node:arch",
                "kbom:k8s:node:kernel",
            ]
        );
        assert_eq!(props.get("kbom:k8s:node:arch"), Some("amd64"));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_serializes_as_name_value_objects() {
        let props = PropertyList::default().vendor("pkg:type", "oci");
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json, serde_json::json!([{ "name": "kbom:pkg:type", "value": "oci" }]));
    }
}
