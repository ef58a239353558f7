//! Arena-backed XML/XHTML document tree
//!
//! Chapters and package documents are parsed with quick-xml into a flat
//! arena of nodes addressed by [`NodeId`]. Ids stay valid across every
//! mutation this crate performs (wrapping, text splitting), which lets
//! resolved positions survive highlight insertion.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{AnchorError, Result};

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        /// Written as `<name/>` when it has no children
        self_closing: bool,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    /// Declaration, doctype and anything else preceding the root element
    prolog: String,
}

impl Document {
    /// Parse an XML/XHTML document
    ///
    /// Common HTML named entities (`&nbsp;`, `&mdash;`, ...) are decoded to
    /// their characters; any other undeclared entity is an error. Decoded
    /// characters are written back literally by [`Document::serialize`].
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            prolog: String::new(),
        };
        let mut prolog = Writer::new(Cursor::new(Vec::new()));
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let self_closing = matches!(event, Event::Empty(_));
                    let data = element_data(&reader, start, self_closing)?;
                    let id = doc.push(data);
                    match stack.last() {
                        Some(&parent) => doc.append_child(parent, id),
                        None if root.is_none() => root = Some(id),
                        // Trailing top-level elements stay detached
                        None => {}
                    }
                    if !self_closing {
                        stack.push(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(ref text) => {
                    if let Some(&parent) = stack.last() {
                        let value = text.unescape_with(html_entity)?.into_owned();
                        let id = doc.push(NodeData::Text(value));
                        doc.append_child(parent, id);
                    } else if root.is_none() {
                        prolog.write_event(&event)?;
                    }
                }
                Event::CData(ref cdata) => {
                    if let Some(&parent) = stack.last() {
                        let text = reader.decoder().decode(cdata)?.into_owned();
                        let id = doc.push(NodeData::Text(text));
                        doc.append_child(parent, id);
                    }
                }
                Event::Comment(ref comment) => {
                    if let Some(&parent) = stack.last() {
                        let text = reader.decoder().decode(comment)?.into_owned();
                        let id = doc.push(NodeData::Comment(text));
                        doc.append_child(parent, id);
                    } else if root.is_none() {
                        prolog.write_event(&event)?;
                    }
                }
                Event::Decl(_) | Event::DocType(_) | Event::PI(_) => {
                    if root.is_none() {
                        prolog.write_event(&event)?;
                    }
                }
                Event::Eof => break,
            }
        }

        doc.root = root.ok_or(AnchorError::NoRootElement)?;
        doc.prolog = String::from_utf8(prolog.into_inner().into_inner())?;
        Ok(doc)
    }

    /// Read and parse a document from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Serialize the document back to markup
    pub fn serialize(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_node(&mut writer, self.root)?;
        let body = String::from_utf8(writer.into_inner().into_inner())?;
        Ok(format!("{}{}", self.prolog, body))
    }

    fn write_node<W: Write>(&self, writer: &mut Writer<W>, id: NodeId) -> Result<()> {
        let node = self.node(id);
        match &node.data {
            NodeData::Element {
                name,
                attributes,
                self_closing,
            } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if node.children.is_empty() && *self_closing {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for &child in &node.children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
            NodeData::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
            }
            NodeData::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
        }
        Ok(())
    }

    // Navigation

    /// The document element
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// The node itself and all of its descendants in document order
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// Whether `id` is attached under the document element
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    /// Qualified element name
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element name without namespace prefix
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id)
            .map(|name| name.rsplit(':').next().unwrap_or(name))
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn id(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, "id")
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Length of a text node in characters; 0 for anything else
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id).filter_map(|n| self.text(n)).collect()
    }

    // Mutation

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str, attributes: Vec<(String, String)>) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_string(),
            attributes,
            self_closing: false,
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id.0].data {
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((key.to_string(), value.to_string())),
            }
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it
    /// from its previous parent first
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Split a text node at a character offset. The tail becomes a new
    /// text node inserted right after the original, which is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let byte = match text.char_indices().nth(offset) {
            Some((byte, _)) => byte,
            None if offset == text.chars().count() => text.len(),
            None => return None,
        };
        let tail = text[byte..].to_string();
        if let NodeData::Text(head) = &mut self.nodes[id.0].data {
            head.truncate(byte);
        }

        let tail_id = self.push(NodeData::Text(tail));
        if let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) {
            self.insert_child(parent, index + 1, tail_id);
        }
        Some(tail_id)
    }

    /// Move `parent`'s children in `start..end` into `wrapper` and put the
    /// wrapper in their place
    pub fn wrap_children(&mut self, parent: NodeId, start: usize, end: usize, wrapper: NodeId) {
        self.detach(wrapper);
        let moved: Vec<NodeId> = self.nodes[parent.0].children.drain(start..end).collect();
        for &child in &moved {
            self.nodes[child.0].parent = Some(wrapper);
        }
        self.nodes[wrapper.0].children.extend(moved);
        self.insert_child(parent, start, wrapper);
    }
}

/// Pre-order traversal, see [`Document::descendants`]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

/// HTML entities XHTML chapters use without declaring them
fn html_entity(name: &str) -> Option<&'static str> {
    let value = match name {
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "sbquo" => "\u{201a}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bdquo" => "\u{201e}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "prime" => "\u{2032}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "lsaquo" => "\u{2039}",
        "rsaquo" => "\u{203a}",
        "middot" => "\u{b7}",
        "para" => "\u{b6}",
        "sect" => "\u{a7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{b0}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "iexcl" => "\u{a1}",
        "iquest" => "\u{bf}",
        "aacute" => "\u{e1}",
        "eacute" => "\u{e9}",
        "iacute" => "\u{ed}",
        "oacute" => "\u{f3}",
        "uacute" => "\u{fa}",
        "ntilde" => "\u{f1}",
        "uuml" => "\u{fc}",
        "ccedil" => "\u{e7}",
        "egrave" => "\u{e8}",
        "agrave" => "\u{e0}",
        _ => return None,
    };
    Some(value)
}

fn element_data(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
    self_closing: bool,
) -> Result<NodeData> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref())?.into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.decode_and_unescape_value(reader)?.into_owned();
        attributes.push((key, value));
    }
    Ok(NodeData::Element {
        name,
        attributes,
        self_closing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head><body><p id="p1">Hello <b>world</b> &amp; more</p><br/><!-- note --></body></html>"#;

    #[test]
    fn test_parse_structure() {
        let doc = Document::parse(CHAPTER).unwrap();
        let html = doc.root();
        assert_eq!(doc.name(html), Some("html"));

        let body = doc.children(html)[1];
        assert_eq!(doc.name(body), Some("body"));

        let p = doc.children(body)[0];
        assert_eq!(doc.id(p), Some("p1"));
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(doc.text(doc.children(p)[2]), Some(" & more"));
        assert_eq!(doc.text_content(p), "Hello world & more");
        assert_eq!(doc.index_in_parent(p), Some(0));
        assert_eq!(doc.ancestors(p).collect::<Vec<_>>(), vec![body, html]);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let doc = Document::parse(CHAPTER).unwrap();
        assert_eq!(doc.serialize().unwrap(), CHAPTER);
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            Document::parse("<?xml version=\"1.0\"?>"),
            Err(AnchorError::NoRootElement)
        ));
    }

    #[test]
    fn test_split_text_multibyte() {
        let mut doc = Document::parse("<p>héllo wörld</p>").unwrap();
        let text = doc.children(doc.root())[0];
        let tail = doc.split_text(text, 7).unwrap();

        assert_eq!(doc.text(text), Some("héllo w"));
        assert_eq!(doc.text(tail), Some("örld"));
        assert_eq!(doc.children(doc.root()), &[text, tail]);
        assert!(doc.split_text(text, 42).is_none());
    }

    #[test]
    fn test_wrap_children() {
        let mut doc = Document::parse("<p>a<b>b</b>c</p>").unwrap();
        let p = doc.root();
        let mark = doc.create_element("mark", vec![]);
        doc.wrap_children(p, 1, 3, mark);

        assert_eq!(doc.serialize().unwrap(), "<p>a<mark><b>b</b>c</mark></p>");
        assert_eq!(doc.parent(mark), Some(p));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.xhtml");
        std::fs::write(&path, "<html><body>text</body></html>").unwrap();

        let doc = Document::from_path(&path).unwrap();
        assert_eq!(doc.text_content(doc.root()), "text");
    }

    #[test]
    fn test_parse_html_named_entities() {
        let doc = Document::parse("<html><body><p>a&nbsp;b&mdash;c &amp; d</p></body></html>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "a\u{a0}b\u{2014}c & d");
        assert_eq!(
            doc.serialize().unwrap(),
            "<html><body><p>a\u{a0}b\u{2014}c &amp; d</p></body></html>"
        );

        assert!(matches!(
            Document::parse("<p>&bogus;</p>"),
            Err(AnchorError::Xml(_))
        ));
    }
}
