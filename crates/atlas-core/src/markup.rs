//! Owned XML tree for resources that have no typed model.
//!
//! Resource documents are small configuration files, so a full in-memory
//! tree is fine. Comments, processing instructions and the prolog are
//! dropped on parse; serialization always emits a UTF-8 declaration because
//! downstream consumers reject documents without one.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// Element and attribute name that carries a resource reference.
pub const RESOURCE_ID_NODE: &str = "ResourceId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    pub root: MarkupElement,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<MarkupElement>,
}

impl MarkupDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::Markup("document is not valid UTF-8".to_string()))?;
        Self::parse_str(text)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack: Vec<MarkupElement> = Vec::new();
        let mut root: Option<MarkupElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(open) = stack.last_mut() {
                        open.text
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Markup("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                // Prolog, comments, PIs and doctypes carry no references.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Markup("unclosed element at end of input".to_string()));
        }
        let root = root.ok_or_else(|| Error::Markup("document has no root element".to_string()))?;
        Ok(Self { root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }

    /// Every `ResourceId` value in the document: element text and attribute
    /// values alike, in document order. This is what reference enumeration
    /// scans.
    pub fn resource_id_values(&self) -> Vec<&str> {
        let mut values = Vec::new();
        collect_resource_ids(&self.root, &mut values);
        values
    }
}

impl MarkupElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&MarkupElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn collect_resource_ids<'a>(element: &'a MarkupElement, values: &mut Vec<&'a str>) {
    if element.name == RESOURCE_ID_NODE && !element.text.is_empty() {
        values.push(element.text.as_str());
    }
    for (name, value) in &element.attributes {
        if name == RESOURCE_ID_NODE && !value.is_empty() {
            values.push(value.as_str());
        }
    }
    for child in &element.children {
        collect_resource_ids(child, values);
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<MarkupElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| Error::Markup(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| Error::Markup(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(MarkupElement {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [MarkupElement],
    root: &mut Option<MarkupElement>,
    element: MarkupElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::Markup(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &MarkupElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_empty() && element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
