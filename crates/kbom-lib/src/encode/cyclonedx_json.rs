//! CycloneDX JSON encoding

use super::encoding_failed;
use crate::bom::Bom;
use crate::error::Result;
use serde::Serialize;

const SCHEMA_URL: &str = "http://cyclonedx.org/schema/bom-1.5.schema.json";

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    #[serde(flatten)]
    bom: &'a Bom,
}

/// Pretty-printed with two-space indentation; markup characters are kept raw
pub(super) fn to_json(bom: &Bom) -> Result<Vec<u8>> {
    let document = Document {
        schema: SCHEMA_URL,
        bom,
    };
    let mut out = serde_json::to_vec_pretty(&document).map_err(encoding_failed)?;
    out.push(b'\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::assemble;
    use crate::encode::test_support::snapshot;
    use serde_json::Value;

    fn encoded() -> (String, Value) {
        let text = String::from_utf8(to_json(&assemble(&snapshot())).unwrap()).unwrap();
        let json = serde_json::from_str(&text).unwrap();
        (text, json)
    }

    #[test]
    fn test_document_header() {
        let (text, json) = encoded();
        assert!(text.starts_with("{\n  \"$schema\": "));
        assert_eq!(json["bomFormat"], "CycloneDX");
        assert_eq!(json["specVersion"], "1.5");
        assert_eq!(json["version"], 1);
        assert_eq!(
            json["serialNumber"],
            "urn:uuid:00000000-0000-4000-8000-000000000001"
        );
        assert_eq!(json["metadata"]["timestamp"], "2023-04-26T10:00:00Z");
        assert_eq!(json["metadata"]["tools"][0]["vendor"], "kbom");
    }

    #[test]
    fn test_component_field_names() {
        let (_, json) = encoded();
        let cluster = &json["metadata"]["component"];
        assert_eq!(cluster["bom-ref"], "pkg:k8s/k8s.io%2Fkubernetes@1.25.1");
        assert_eq!(cluster["type"], "platform");
        assert_eq!(cluster["properties"][0]["name"], "cdx:k8s:component:type");

        let image = &json["components"][1];
        assert_eq!(image["type"], "container");
        assert_eq!(image["purl"], image["bom-ref"]);

        let dependency = &json["dependencies"][0];
        assert_eq!(dependency["ref"], "pkg:k8s/k8s.io%2Fkubernetes@1.25.1");
        assert!(dependency["dependsOn"].is_array());
    }

    #[test]
    fn test_markup_characters_not_escaped() {
        let (text, _) = encoded();
        assert!(text.contains("Ubuntu <22.04> & friends"));
        assert!(!text.contains("\\u003c"));
    }

    #[test]
    fn test_empty_optional_fields_omitted() {
        let (_, json) = encoded();
        let node = &json["components"][0];
        assert!(node.get("version").is_none());
        assert!(node.get("purl").is_none());
    }
}
