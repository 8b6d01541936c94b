//! Registry loader
//!
//! The registry mixes markup and text inside a single declaration
//! (`<member>const <type>char</type>* <name>pName</name></member>`), so it is
//! loaded into a small owned element tree rather than deserialized straight
//! into typed structs. Text nodes are kept in document order next to the
//! child elements.

use crate::error::{RegistryError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::debug;

/// A node inside an element: either a child element or a run of text
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An owned XML element with attributes and ordered children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of an attribute, if present
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Child elements with the given tag
    pub fn elements_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.name == tag)
    }

    /// First child element with the given tag
    pub fn child(&self, tag: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == tag)
    }

    /// All descendant elements with the given tag, depth first
    pub fn descendants_named<'a>(&'a self, tag: &'a str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(tag, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, tag: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.name == tag {
                found.push(child);
            }
            child.collect_descendants(tag, found);
        }
    }

    /// Text that appears before the first child element
    pub fn leading_text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(_) => break,
            }
        }
        out
    }

    /// Concatenated text of this element and all descendants
    pub fn all_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.push_text(out),
            }
        }
    }

    /// Trimmed text of the first child with the given tag
    pub fn child_text(&self, tag: &str) -> Option<String> {
        self.child(tag)
            .map(|e| e.all_text().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Text found before the first child with the given tag, descending into
    /// other elements on the way
    pub fn text_before(&self, tag: &str) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) if e.name == tag => break,
                XmlNode::Element(e) => e.push_text(&mut out),
            }
        }
        out
    }

    /// Text found after the first child with the given tag. `comment`
    /// elements are not part of a declaration and are skipped.
    pub fn text_after(&self, tag: &str) -> String {
        let mut out = String::new();
        let mut seen = false;
        for node in &self.children {
            match node {
                XmlNode::Element(e) if !seen && e.name == tag => seen = true,
                _ if !seen => {}
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) if e.name == "comment" => {}
                XmlNode::Element(e) => e.push_text(&mut out),
            }
        }
        out
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| RegistryError::Malformed(e.to_string()))?
        .to_string();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RegistryError::Malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| RegistryError::Malformed(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| RegistryError::Malformed(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parse a registry document held in memory and return its root element
pub fn parse_document(content: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| RegistryError::Malformed(format!("at byte {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RegistryError::Malformed("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| RegistryError::Malformed(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(RegistryError::Malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| RegistryError::Malformed("document has no root element".to_string()))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(RegistryError::Malformed(
            "document has more than one root element".to_string(),
        )),
    }
}

/// Load and parse a registry file. A missing or unreadable file is fatal.
pub fn load_registry(path: &Path) -> Result<XmlElement> {
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "Parsing registry document");
    parse_document(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_content() {
        let xml = r#"<registry><member len="count">const <type>char</type>* <name>pName</name></member></registry>"#;
        let root = parse_document(xml).unwrap();
        let member = root.child("member").unwrap();
        assert_eq!(member.attr("len"), Some("count"));
        assert_eq!(member.child_text("type").as_deref(), Some("char"));
        assert_eq!(member.text_before("name"), "const char* ");
        assert_eq!(member.all_text(), "const char* pName");
    }

    #[test]
    fn test_text_after_skips_comments() {
        let xml = r#"<member><type>uint8_t</type> <name>uuid</name>[<enum>VK_UUID_SIZE</enum>]<comment>note</comment></member>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.text_after("name"), "[VK_UUID_SIZE]");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = r#"<types><type category="define">#define <name>X</name> (1 &lt;&lt; 2)</type></types>"#;
        let root = parse_document(xml).unwrap();
        let ty = root.child("type").unwrap();
        assert!(ty.all_text().contains("(1 << 2)"));
    }

    #[test]
    fn test_descendants() {
        let xml = r#"<a><b><c n="1"/></b><c n="2"/></a>"#;
        let root = parse_document(xml).unwrap();
        let found: Vec<_> = root
            .descendants_named("c")
            .iter()
            .filter_map(|c| c.attr("n"))
            .collect();
        assert_eq!(found, vec!["1", "2"]);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            parse_document("<registry><types></registry>"),
            Err(RegistryError::Malformed(_))
        ));
        assert!(matches!(
            parse_document("<registry>"),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_registry(&dir.path().join("vk.xml"));
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vk.xml");
        std::fs::write(&path, "<registry><types/></registry>").unwrap();
        let root = load_registry(&path).unwrap();
        assert_eq!(root.name, "registry");
        assert!(root.child("types").is_some());
    }
}
