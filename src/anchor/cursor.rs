//! Resolution cursor
//!
//! A cursor is an immutable value: every transition hands back a new one,
//! so a failed resolution never leaves a half-moved pointer behind.

use std::fmt;
use std::ptr;

use crate::dom::{Boundary, Document, NodeId, Side};

/// A live position to encode: a node plus, for text nodes, a character
/// offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: Option<usize>,
}

impl Position {
    pub fn text(node: NodeId, offset: usize) -> Self {
        Self {
            node,
            offset: Some(offset),
        }
    }

    pub fn element(node: NodeId) -> Self {
        Self { node, offset: None }
    }
}

impl From<Boundary> for Position {
    fn from(boundary: Boundary) -> Self {
        Self::text(boundary.node, boundary.offset)
    }
}

/// Transient resolution pointer: a node inside a specific document
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    document: &'a Document,
    node: NodeId,
    offset: Option<usize>,
}

impl<'a> Cursor<'a> {
    /// Cursor on the document element
    pub fn root(document: &'a Document) -> Self {
        Self {
            document,
            node: document.root(),
            offset: None,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn position(&self) -> Position {
        Position {
            node: self.node,
            offset: self.offset,
        }
    }

    /// Move to another node of the same document, dropping any offset
    pub fn descend(self, node: NodeId) -> Self {
        Self {
            node,
            offset: None,
            ..self
        }
    }

    pub fn with_offset(self, offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..self
        }
    }

    /// Switch tree context to another document's root
    pub fn enter_document(self, document: &'a Document) -> Self {
        Self::root(document)
    }

    /// Range boundary for this cursor. Text cursors keep their offset;
    /// element cursors sit before the element when opening a range and
    /// after it when closing one.
    pub fn boundary(&self, side: Side) -> Option<Boundary> {
        if self.document.is_text(self.node) {
            return Some(Boundary::new(self.node, self.offset.unwrap_or(0)));
        }
        match side {
            Side::Start => Boundary::before(self.document, self.node),
            Side::End => Boundary::after(self.document, self.node),
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.document, other.document)
            && self.node == other.node
            && self.offset == other.offset
    }
}

impl Eq for Cursor<'_> {}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("document", &(self.document as *const Document))
            .field("node", &self.node)
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_return_new_values() {
        let doc = Document::parse("<p>ab<i>c</i></p>").unwrap();
        let root = Cursor::root(&doc);
        let text = doc.children(doc.root())[0];

        let moved = root.descend(text).with_offset(1);
        assert_eq!(root.node(), doc.root());
        assert_eq!(moved.position(), Position::text(text, 1));
        assert_eq!(moved.descend(text).offset(), None);
    }

    #[test]
    fn test_equality_tracks_document_identity() {
        let a = Document::parse("<p/>").unwrap();
        let b = Document::parse("<p/>").unwrap();

        assert_eq!(Cursor::root(&a), Cursor::root(&a));
        assert_ne!(Cursor::root(&a), Cursor::root(&b));
        assert_eq!(Cursor::root(&a).enter_document(&b), Cursor::root(&b));
    }

    #[test]
    fn test_element_boundaries() {
        let doc = Document::parse("<p>ab<i>c</i></p>").unwrap();
        let i = doc.children(doc.root())[1];
        let cursor = Cursor::root(&doc).descend(i);

        assert_eq!(cursor.boundary(Side::Start), Some(Boundary::new(doc.root(), 1)));
        assert_eq!(cursor.boundary(Side::End), Some(Boundary::new(doc.root(), 2)));
        assert_eq!(Cursor::root(&doc).boundary(Side::Start), None);
    }
}
