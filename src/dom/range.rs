//! DOM-style ranges over a [`Document`]
//!
//! A [`Boundary`] inside a text node carries a character offset; inside an
//! element it carries a child index, exactly like DOM range boundaries.

use thiserror::Error;

use super::document::{Document, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range boundary is not attached to the document")]
    Detached,

    #[error("Offset {offset} out of range for node of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Range is not confined to a single container")]
    NotConfined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point just before `node` in its parent
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)?))
    }

    /// The point just after `node` in its parent
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_in_parent(node)? + 1))
    }

    /// Number of positions inside the boundary's container
    fn container_len(doc: &Document, node: NodeId) -> usize {
        if doc.is_text(node) {
            doc.text_len(node)
        } else {
            doc.children(node).len()
        }
    }

    fn validate(&self, doc: &Document) -> Result<(), RangeError> {
        if !doc.is_attached(self.node) {
            return Err(RangeError::Detached);
        }
        let len = Self::container_len(doc, self.node);
        if self.offset > len {
            return Err(RangeError::OffsetOutOfRange {
                offset: self.offset,
                len,
            });
        }
        Ok(())
    }

    /// Character offset of this boundary within the document's text content
    pub fn text_offset(&self, doc: &Document) -> usize {
        if doc.is_text(self.node) {
            return text_before(doc, self.node) + self.offset;
        }
        match doc.children(self.node).get(self.offset) {
            Some(&child) => text_before(doc, child),
            None => text_before(doc, self.node) + doc.text_content(self.node).chars().count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Deepest node containing both boundary containers
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        common_ancestor(doc, self.start.node, self.end.node)
    }

    /// Text content covered by the range
    pub fn text(&self, doc: &Document) -> String {
        let start = self.start.text_offset(doc);
        let end = self.end.text_offset(doc);
        doc.text_content(doc.root())
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }
}

/// Deepest common inclusive ancestor of two nodes
pub fn common_ancestor(doc: &Document, a: NodeId, b: NodeId) -> Option<NodeId> {
    let chain_a: Vec<NodeId> = std::iter::once(a).chain(doc.ancestors(a)).collect();
    std::iter::once(b)
        .chain(doc.ancestors(b))
        .find(|n| chain_a.contains(n))
}

/// Characters of text preceding `node` in document order
fn text_before(doc: &Document, node: NodeId) -> usize {
    doc.descendants(doc.root())
        .take_while(|&n| n != node)
        .map(|n| doc.text_len(n))
        .sum()
}

/// Which way a text offset sitting between two text nodes should lean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Prefer the start of the following text node
    Start,
    /// Prefer the end of the preceding text node
    End,
}

impl Document {
    /// Map a character offset of the document's text content back to a
    /// text boundary
    pub fn boundary_at(&self, offset: usize, side: Side) -> Option<Boundary> {
        let mut consumed = 0;
        let mut last = None;
        for node in self.descendants(self.root()).filter(|&n| self.is_text(n)) {
            let len = self.text_len(node);
            let hit = match side {
                Side::Start => offset < consumed + len,
                Side::End => offset <= consumed + len && (offset > consumed || consumed == 0),
            };
            if hit && offset >= consumed {
                return Some(Boundary::new(node, offset - consumed));
            }
            consumed += len;
            last = Some(node);
        }
        // Past the final character
        let last = last?;
        (offset == consumed).then(|| Boundary::new(last, self.text_len(last)))
    }

    /// First occurrence of `needle` in the document's text content
    pub fn find_text(&self, needle: &str) -> Option<DomRange> {
        if needle.is_empty() {
            return None;
        }
        let haystack = self.text_content(self.root());
        let byte = haystack.find(needle)?;
        let start = haystack[..byte].chars().count();
        let end = start + needle.chars().count();
        Some(DomRange::new(
            self.boundary_at(start, Side::Start)?,
            self.boundary_at(end, Side::End)?,
        ))
    }
}

/// Wrap the contents of a single-container range in a new element.
///
/// Partially selected text nodes are split first. Afterwards both
/// boundaries must sit in the same element. Returns `None` without
/// calling `make_wrapper` when the range covers nothing.
pub fn surround_contents<F>(
    doc: &mut Document,
    range: &DomRange,
    make_wrapper: F,
) -> Result<Option<NodeId>, RangeError>
where
    F: FnOnce(&mut Document) -> NodeId,
{
    range.start.validate(doc)?;
    range.end.validate(doc)?;

    // End first, so that splitting it never invalidates the start offset
    let mut end = container_point(doc, range.end)?;

    let start = if doc.is_text(range.start.node) {
        let text = range.start.node;
        let (parent, index) = position_in_parent(doc, text)?;
        let offset = range.start.offset;
        if offset == 0 {
            Boundary::new(parent, index)
        } else if offset >= doc.text_len(text) {
            Boundary::new(parent, index + 1)
        } else {
            doc.split_text(text, offset);
            // The split inserted a sibling right after the start text
            if end.node == parent && end.offset > index {
                end.offset += 1;
            }
            Boundary::new(parent, index + 1)
        }
    } else {
        range.start
    };

    if start.node != end.node {
        return Err(RangeError::NotConfined);
    }
    if start.offset >= end.offset {
        return Ok(None);
    }

    let wrapper = make_wrapper(doc);
    doc.wrap_children(start.node, start.offset, end.offset, wrapper);
    Ok(Some(wrapper))
}

/// Turn a boundary into an element boundary, splitting a text container
/// at the boundary's offset
fn container_point(doc: &mut Document, boundary: Boundary) -> Result<Boundary, RangeError> {
    if !doc.is_text(boundary.node) {
        return Ok(boundary);
    }
    let (parent, index) = position_in_parent(doc, boundary.node)?;
    if boundary.offset == 0 {
        return Ok(Boundary::new(parent, index));
    }
    if boundary.offset < doc.text_len(boundary.node) {
        doc.split_text(boundary.node, boundary.offset);
    }
    Ok(Boundary::new(parent, index + 1))
}

fn position_in_parent(doc: &Document, node: NodeId) -> Result<(NodeId, usize), RangeError> {
    match (doc.parent(node), doc.index_in_parent(node)) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(RangeError::Detached),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(doc: &mut Document, range: &DomRange) -> Result<Option<NodeId>, RangeError> {
        surround_contents(doc, range, |doc| doc.create_element("mark", vec![]))
    }

    #[test]
    fn test_find_text_within_node() {
        let doc = Document::parse("<p>Hello <b>world</b></p>").unwrap();
        let range = doc.find_text("Hello").unwrap();
        let text = doc.children(doc.root())[0];

        assert_eq!(range.start, Boundary::new(text, 0));
        assert_eq!(range.end, Boundary::new(text, 5));
        assert_eq!(range.text(&doc), "Hello");
    }

    #[test]
    fn test_find_text_across_nodes() {
        let doc = Document::parse("<p>Hello <b>world</b></p>").unwrap();
        let range = doc.find_text("lo wor").unwrap();
        let b = doc.children(doc.root())[1];
        let world = doc.children(b)[0];

        assert_eq!(range.end, Boundary::new(world, 3));
        assert_eq!(range.text(&doc), "lo wor");
        assert_eq!(range.common_ancestor(&doc), Some(doc.root()));
        assert!(doc.find_text("absent").is_none());
    }

    #[test]
    fn test_boundary_at_leans_by_side() {
        let doc = Document::parse("<p>ab<i>cd</i></p>").unwrap();
        let ab = doc.children(doc.root())[0];
        let cd = doc.children(doc.children(doc.root())[1])[0];

        assert_eq!(doc.boundary_at(2, Side::Start), Some(Boundary::new(cd, 0)));
        assert_eq!(doc.boundary_at(2, Side::End), Some(Boundary::new(ab, 2)));
        assert_eq!(doc.boundary_at(0, Side::End), Some(Boundary::new(ab, 0)));
        assert_eq!(doc.boundary_at(4, Side::Start), Some(Boundary::new(cd, 2)));
        assert_eq!(doc.boundary_at(5, Side::Start), None);
    }

    #[test]
    fn test_text_offset_of_element_boundaries() {
        let doc = Document::parse("<p>ab<i>cd</i>ef</p>").unwrap();
        let p = doc.root();
        assert_eq!(Boundary::new(p, 1).text_offset(&doc), 2);
        assert_eq!(Boundary::new(p, 2).text_offset(&doc), 4);
        assert_eq!(Boundary::new(p, 3).text_offset(&doc), 6);
    }

    #[test]
    fn test_surround_within_single_text() {
        let mut doc = Document::parse("<p>Hello world</p>").unwrap();
        let text = doc.children(doc.root())[0];
        let range = DomRange::new(Boundary::new(text, 6), Boundary::new(text, 11));

        assert!(wrap(&mut doc, &range).unwrap().is_some());
        assert_eq!(doc.serialize().unwrap(), "<p>Hello <mark>world</mark></p>");
    }

    #[test]
    fn test_surround_shifts_end_after_start_split() {
        let mut doc = Document::parse("<p>Hello <b>big</b> world</p>").unwrap();
        let p = doc.root();
        let text = doc.children(p)[0];
        let range = DomRange::new(Boundary::new(text, 3), Boundary::new(p, 2));

        wrap(&mut doc, &range).unwrap();
        assert_eq!(
            doc.serialize().unwrap(),
            "<p>Hel<mark>lo <b>big</b></mark> world</p>"
        );
    }

    #[test]
    fn test_surround_rejects_unconfined_range() {
        let mut doc = Document::parse("<p>ab<i>cd</i></p>").unwrap();
        let ab = doc.children(doc.root())[0];
        let cd = doc.children(doc.children(doc.root())[1])[0];
        let range = DomRange::new(Boundary::new(ab, 1), Boundary::new(cd, 1));

        assert_eq!(wrap(&mut doc, &range), Err(RangeError::NotConfined));
    }

    #[test]
    fn test_surround_empty_range_is_noop() {
        let mut doc = Document::parse("<p>ab</p>").unwrap();
        let ab = doc.children(doc.root())[0];
        let range = DomRange::new(Boundary::new(ab, 2), Boundary::new(doc.root(), 1));

        assert_eq!(wrap(&mut doc, &range), Ok(None));
        assert_eq!(doc.serialize().unwrap(), "<p>ab</p>");
    }

    #[test]
    fn test_surround_validates_offsets() {
        let mut doc = Document::parse("<p>ab</p>").unwrap();
        let ab = doc.children(doc.root())[0];
        let range = DomRange::new(Boundary::new(ab, 0), Boundary::new(ab, 9));

        assert_eq!(
            wrap(&mut doc, &range),
            Err(RangeError::OffsetOutOfRange { offset: 9, len: 2 })
        );
    }
}
