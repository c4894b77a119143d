//! CycloneDX XML encoding

use super::encoding_failed;
use crate::bom::{Bom, Component, Dependency, Tool};
use crate::error::Result;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const XMLNS: &str = "http://cyclonedx.org/schema/bom/1.5";

/// Two-space indented document. Only `<`, `>` and `&` are escaped in text.
pub(super) fn to_xml(bom: &Bom) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new();

    xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let version = bom.version.to_string();
    let mut root = BytesStart::new("bom");
    root.push_attribute(("xmlns", XMLNS));
    root.push_attribute(("serialNumber", bom.serial_number.as_str()));
    root.push_attribute(("version", version.as_str()));
    xml.event(Event::Start(root))?;

    xml.start("metadata")?;
    xml.text_element("timestamp", &bom.metadata.timestamp)?;
    xml.start("tools")?;
    for tool in &bom.metadata.tools {
        xml.tool(tool)?;
    }
    xml.end("tools")?;
    xml.component(&bom.metadata.component)?;
    xml.end("metadata")?;

    xml.start("components")?;
    for component in &bom.components {
        xml.component(component)?;
    }
    xml.end("components")?;

    xml.start("dependencies")?;
    for dependency in &bom.dependencies {
        xml.dependency(dependency)?;
    }
    xml.end("dependencies")?;

    xml.end("bom")?;
    Ok(xml.finish())
}

struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(encoding_failed)
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        self.end(name)
    }

    fn tool(&mut self, tool: &Tool) -> Result<()> {
        self.start("tool")?;
        self.text_element("vendor", &tool.vendor)?;
        self.text_element("name", &tool.name)?;
        self.text_element("version", &tool.version)?;
        self.end("tool")
    }

    fn component(&mut self, component: &Component) -> Result<()> {
        let mut start = BytesStart::new("component");
        if let Some(bom_ref) = &component.bom_ref {
            start.push_attribute(("bom-ref", bom_ref.as_str()));
        }
        start.push_attribute(("type", component.component_type.as_str()));
        self.event(Event::Start(start))?;

        self.text_element("name", &component.name)?;
        if !component.version.is_empty() {
            self.text_element("version", &component.version)?;
        }
        if let Some(purl) = &component.purl {
            self.text_element("purl", purl)?;
        }

        self.start("properties")?;
        for (name, value) in component.properties.iter() {
            let mut property = BytesStart::new("property");
            property.push_attribute(("name", name));
            self.event(Event::Start(property))?;
            self.event(Event::Text(BytesText::from_escaped(partial_escape(value))))?;
            self.end("property")?;
        }
        self.end("properties")?;

        self.end("component")
    }

    fn dependency(&mut self, dependency: &Dependency) -> Result<()> {
        let mut start = BytesStart::new("dependency");
        start.push_attribute(("ref", dependency.reference.as_str()));
        self.event(Event::Start(start))?;

        for target in &dependency.depends_on {
            let mut child = BytesStart::new("dependency");
            child.push_attribute(("ref", target.as_str()));
            self.event(Event::Empty(child))?;
        }

        self.end("dependency")
    }

    fn finish(self) -> Vec<u8> {
        let mut out = self.writer.into_inner();
        out.push(b'\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::assemble;
    use crate::encode::test_support::snapshot;

    fn encoded() -> String {
        String::from_utf8(to_xml(&assemble(&snapshot())).unwrap()).unwrap()
    }

    #[test]
    fn test_document_root() {
        let xml = encoded();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<bom xmlns=\"http://cyclonedx.org/schema/bom/1.5\" serialNumber=\"urn:uuid:00000000-0000-4000-8000-000000000001\" version=\"1\">"
        ));
        assert!(xml.trim_end().ends_with("</bom>"));
    }

    #[test]
    fn test_metadata_and_components() {
        let xml = encoded();
        assert!(xml.contains("<timestamp>2023-04-26T10:00:00Z</timestamp>"));
        assert!(xml.contains("type=\"platform\""));
        assert!(xml.contains("type=\"container\""));
        assert!(xml.contains("<name>k8s.io/kubernetes</name>"));
        assert!(xml.contains(
            "<property name=\"cdx:k8s:component:type\">cluster</property>"
        ));
        assert!(xml.contains("<property name=\"kbom:k8s:node:capacity:cpu\">1930m</property>"));
    }

    #[test]
    fn test_two_space_indentation() {
        let xml = encoded();
        assert!(xml.contains("\n  <metadata>"));
        assert!(xml.contains("\n    <timestamp>"));
    }

    #[test]
    fn test_only_required_characters_escaped() {
        let xml = encoded();
        assert!(xml.contains("Ubuntu &lt;22.04&gt; &amp; friends"));
    }

    #[test]
    fn test_dependencies_nested() {
        let xml = encoded();
        assert!(xml.contains("<dependency ref=\"pkg:k8s/k8s.io%2Fkubernetes@1.25.1\">"));
        assert!(xml.matches("<dependency ref=").count() >= 2);
    }

    #[test]
    fn test_parses_back() {
        let xml = encoded();
        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut components = 0;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"component" => components += 1,
                Event::Eof => break,
                _ => {}
            }
        }
        // metadata component + node + image + one resource
        assert_eq!(components, 4);
    }
}
