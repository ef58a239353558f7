//! Encoder: live position -> portable path
//!
//! Indices are computed over [`MarkerSpec::logical_children`], so
//! highlights already present in the document do not change the result.

use thiserror::Error;

use super::cursor::Position;
use crate::cfi::{element_step, text_step, Path, PathComponent};
use crate::dom::{Boundary, Document, MarkerSpec, NodeId, Side};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Node is not attached to the document")]
    Detached,

    #[error("Offset {offset} out of range for text of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Child index does not fit a path step")]
    IndexOverflow,

    #[error("Highlight markers are not addressable")]
    MarkerNode,

    #[error("No text at the selection boundary")]
    NoText,
}

pub struct Encoder<'a> {
    document: &'a Document,
    marker: &'a MarkerSpec,
}

impl<'a> Encoder<'a> {
    pub fn new(document: &'a Document, marker: &'a MarkerSpec) -> Self {
        Self { document, marker }
    }

    /// Encode a position relative to the document element.
    ///
    /// A text position without an offset is taken to mean offset 0.
    pub fn encode(&self, position: Position) -> Result<Path, EncodeError> {
        let doc = self.document;
        let node = position.node;
        if !doc.is_attached(node) {
            return Err(EncodeError::Detached);
        }
        if self.marker.is_marker(doc, node) {
            return Err(EncodeError::MarkerNode);
        }

        // Groups of (step, id assertion), innermost first
        let mut levels: Vec<(u32, Option<&str>)> = Vec::new();
        let mut offset = None;
        let mut current = node;

        if doc.is_text(node) {
            let local = position.offset.unwrap_or(0);
            let len = doc.text_len(node);
            if local > len {
                return Err(EncodeError::OffsetOutOfRange { offset: local, len });
            }
            let parent = self
                .marker
                .logical_parent(doc, node)
                .ok_or(EncodeError::Detached)?;
            let (step, run_offset) = self.text_step(parent, node)?;
            levels.push((step, None));
            offset = Some(to_u32(run_offset + local)?);
            current = parent;
        }

        while current != doc.root() {
            let parent = self
                .marker
                .logical_parent(doc, current)
                .ok_or(EncodeError::Detached)?;
            levels.push((self.element_step(parent, current)?, doc.id(current)));
            current = parent;
        }

        let mut path = Path::new();
        for (step, id) in levels.into_iter().rev() {
            path.push(PathComponent::Step(step));
            if let Some(id) = id {
                path.push(PathComponent::id(id));
            }
        }
        if let Some(offset) = offset {
            path.set_character_offset(offset);
        }
        Ok(path)
    }

    /// Even step of an element among its logical siblings
    fn element_step(&self, parent: NodeId, node: NodeId) -> Result<u32, EncodeError> {
        let doc = self.document;
        let index = self
            .marker
            .logical_children(doc, parent)
            .into_iter()
            .filter(|&c| doc.is_element(c))
            .position(|c| c == node)
            .ok_or(EncodeError::Detached)?;
        element_step(index).ok_or(EncodeError::IndexOverflow)
    }

    /// Odd step of the run containing `node`, plus the characters of the
    /// run that precede it
    fn text_step(&self, parent: NodeId, node: NodeId) -> Result<(u32, usize), EncodeError> {
        let doc = self.document;
        let siblings = self.marker.logical_children(doc, parent);
        let position = siblings
            .iter()
            .position(|&c| c == node)
            .ok_or(EncodeError::Detached)?;

        let preceding = &siblings[..position];
        let run_offset = preceding
            .iter()
            .rev()
            .take_while(|&&c| doc.is_text(c))
            .map(|&c| doc.text_len(c))
            .sum();
        let elements_before = preceding.iter().filter(|&&c| doc.is_element(c)).count();

        let step = text_step(elements_before).ok_or(EncodeError::IndexOverflow)?;
        Ok((step, run_offset))
    }
}

fn to_u32(value: usize) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::IndexOverflow)
}

/// Map a selection boundary onto a text position.
///
/// Text boundaries are kept as they are. Element boundaries move to the
/// first following text when opening a range and to the last preceding
/// text when closing one.
pub fn normalize_boundary(
    doc: &Document,
    boundary: Boundary,
    side: Side,
) -> Result<Position, EncodeError> {
    if !doc.is_attached(boundary.node) {
        return Err(EncodeError::Detached);
    }
    if doc.is_text(boundary.node) {
        return Ok(boundary.into());
    }
    doc.boundary_at(boundary.text_offset(doc), side)
        .map(Position::from)
        .ok_or(EncodeError::NoText)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(doc: &Document, position: Position) -> String {
        let marker = MarkerSpec::default();
        Encoder::new(doc, &marker).encode(position).unwrap().to_string()
    }

    #[test]
    fn test_encode_text_in_nested_elements() {
        let doc =
            Document::parse(r#"<html><head/><body><p id="p1">Hello <b>world</b></p></body></html>"#)
                .unwrap();
        let body = doc.children(doc.root())[1];
        let p = doc.children(body)[0];
        let hello = doc.children(p)[0];
        let b = doc.children(p)[1];
        let world = doc.children(b)[0];

        assert_eq!(encode(&doc, Position::text(hello, 0)), "/4/2[p1]/1:0");
        assert_eq!(encode(&doc, Position::text(world, 2)), "/4/2[p1]/2/1:2");
        assert_eq!(encode(&doc, Position::element(b)), "/4/2[p1]/2");
    }

    #[test]
    fn test_encode_text_after_element() {
        let doc = Document::parse("<p><i>a</i>tail</p>").unwrap();
        let tail = doc.children(doc.root())[1];
        assert_eq!(encode(&doc, Position::text(tail, 4)), "/3:4");
    }

    #[test]
    fn test_encode_merges_marker_text_into_run() {
        let doc = Document::parse(
            r#"<p>Hello <mark class="amnesia-highlight">wor</mark>ld<i>x</i></p>"#,
        )
        .unwrap();
        let p = doc.root();
        let mark = doc.children(p)[1];
        let wor = doc.children(mark)[0];
        let ld = doc.children(p)[2];
        let i = doc.children(p)[3];

        assert_eq!(encode(&doc, Position::text(wor, 1)), "/1:7");
        assert_eq!(encode(&doc, Position::text(ld, 1)), "/1:10");
        assert_eq!(encode(&doc, Position::element(i)), "/2");
    }

    #[test]
    fn test_encode_rejects_bad_positions() {
        let mut doc = Document::parse(r#"<p>ab<mark class="amnesia-highlight">c</mark></p>"#)
            .unwrap();
        let marker = MarkerSpec::default();
        let ab = doc.children(doc.root())[0];
        let mark = doc.children(doc.root())[1];
        let loose = doc.create_text("loose");
        let encoder = Encoder::new(&doc, &marker);

        assert_eq!(
            encoder.encode(Position::text(ab, 3)),
            Err(EncodeError::OffsetOutOfRange { offset: 3, len: 2 })
        );
        assert_eq!(encoder.encode(Position::element(mark)), Err(EncodeError::MarkerNode));
        assert_eq!(encoder.encode(Position::text(loose, 0)), Err(EncodeError::Detached));
    }

    #[test]
    fn test_normalize_boundary() {
        let doc = Document::parse("<div><p>ab</p><p>cd</p></div>").unwrap();
        let div = doc.root();
        let ab = doc.children(doc.children(div)[0])[0];
        let cd = doc.children(doc.children(div)[1])[0];

        assert_eq!(
            normalize_boundary(&doc, Boundary::new(div, 1), Side::Start),
            Ok(Position::text(cd, 0))
        );
        assert_eq!(
            normalize_boundary(&doc, Boundary::new(div, 1), Side::End),
            Ok(Position::text(ab, 2))
        );
        assert_eq!(
            normalize_boundary(&doc, Boundary::new(ab, 1), Side::End),
            Ok(Position::text(ab, 1))
        );
    }
}
