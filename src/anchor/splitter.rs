//! Range splitter
//!
//! A highlight can only wrap siblings of one element. A range that
//! crosses element boundaries is cut into pieces that each stay inside a
//! single element; text boundaries count as lying in their parent.

use crate::dom::{common_ancestor, Boundary, Document, DomRange, NodeId, RangeError};

/// Split `range` into sub-ranges, in document order, that
/// [`surround_contents`](crate::dom::surround_contents) can wrap.
///
/// When both boundaries sit directly in the same element the range comes
/// back whole. Wrapping a sub-range only moves nodes inside its own
/// element, so the pieces stay valid when applied from last to first.
pub fn split_range(doc: &Document, range: &DomRange) -> Result<Vec<DomRange>, RangeError> {
    let (start, end) = (range.start, range.end);
    if !doc.is_attached(start.node) || !doc.is_attached(end.node) {
        return Err(RangeError::Detached);
    }

    let start_element = container_of(doc, start).ok_or(RangeError::Detached)?;
    let end_element = container_of(doc, end).ok_or(RangeError::Detached)?;
    let ancestor =
        common_ancestor(doc, start_element, end_element).ok_or(RangeError::Detached)?;
    let start_chain = chain_below(doc, start_element, ancestor);
    let end_chain = chain_below(doc, end_element, ancestor);

    if start_chain.is_empty() && end_chain.is_empty() {
        return Ok(keep_non_empty(doc, vec![*range]));
    }

    let mut pieces = Vec::new();

    // Start side, innermost first: the rest of each element
    let mut from = start;
    for &node in &start_chain {
        pieces.push(DomRange::new(from, Boundary::new(node, doc.children(node).len())));
        from = Boundary::after(doc, node).ok_or(RangeError::Detached)?;
    }

    // End side, outermost first: the head of each element
    let mut tail = Vec::new();
    let mut to = end;
    for &node in &end_chain {
        tail.push(DomRange::new(Boundary::new(node, 0), to));
        to = Boundary::before(doc, node).ok_or(RangeError::Detached)?;
    }

    // Siblings between the two chains
    pieces.push(DomRange::new(from, to));
    pieces.extend(tail.into_iter().rev());

    Ok(keep_non_empty(doc, pieces))
}

/// Element whose children a boundary points between
fn container_of(doc: &Document, boundary: Boundary) -> Option<NodeId> {
    if doc.is_text(boundary.node) {
        doc.parent(boundary.node)
    } else {
        Some(boundary.node)
    }
}

/// `node` and its ancestors strictly below `ancestor`, innermost first
fn chain_below(doc: &Document, node: NodeId, ancestor: NodeId) -> Vec<NodeId> {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .take_while(|&n| n != ancestor)
        .collect()
}

/// Position of a boundary among its container's children, in half steps:
/// `2i` before child `i`, `2i + 1` inside text child `i`
fn slot(doc: &Document, boundary: Boundary) -> Option<usize> {
    if !doc.is_text(boundary.node) {
        return Some(boundary.offset * 2);
    }
    let index = doc.index_in_parent(boundary.node)?;
    Some(match boundary.offset {
        0 => index * 2,
        offset if offset >= doc.text_len(boundary.node) => index * 2 + 2,
        _ => index * 2 + 1,
    })
}

fn keep_non_empty(doc: &Document, pieces: Vec<DomRange>) -> Vec<DomRange> {
    pieces
        .into_iter()
        .filter(|piece| {
            if piece.start.node == piece.end.node {
                return piece.start.offset < piece.end.offset;
            }
            match (slot(doc, piece.start), slot(doc, piece.end)) {
                (Some(from), Some(to)) => from < to,
                _ => true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{surround_contents, MarkerSpec};

    fn apply(doc: &mut Document, range: &DomRange) -> usize {
        let marker = MarkerSpec::default();
        let pieces = split_range(doc, range).unwrap();
        for piece in pieces.iter().rev() {
            surround_contents(doc, piece, |doc| marker.create_marker(doc, "a")).unwrap();
        }
        pieces.len()
    }

    #[test]
    fn test_single_container_is_one_piece() {
        let doc = Document::parse("<p>Hello world</p>").unwrap();
        let range = doc.find_text("lo wo").unwrap();
        assert_eq!(split_range(&doc, &range).unwrap(), vec![range]);
    }

    #[test]
    fn test_siblings_of_one_parent_stay_whole() {
        let mut doc = Document::parse("<p>ab<i>c</i>de</p>").unwrap();
        let range = doc.find_text("bcd").unwrap();
        assert_eq!(split_range(&doc, &range).unwrap(), vec![range]);

        assert_eq!(apply(&mut doc, &range), 1);
        assert_eq!(
            doc.serialize().unwrap(),
            r#"<p>a<mark class="amnesia-highlight" data-annotation-id="a">b<i>c</i>d</mark>e</p>"#
        );
    }

    #[test]
    fn test_empty_pieces_are_dropped() {
        let doc = Document::parse("<div><p>ab</p><p>cd</p></div>").unwrap();
        let div = doc.root();
        let ab = doc.children(doc.children(div)[0])[0];
        let cd = doc.children(doc.children(div)[1])[0];

        // Ends of both paragraphs touch: nothing but the two texts
        let range = DomRange::new(Boundary::new(ab, 2), Boundary::new(cd, 0));
        assert!(split_range(&doc, &range).unwrap().is_empty());

        let range = DomRange::new(Boundary::new(ab, 1), Boundary::new(cd, 1));
        let texts: Vec<String> = split_range(&doc, &range)
            .unwrap()
            .iter()
            .map(|piece| piece.text(&doc))
            .collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_split_preserves_text() {
        let doc = Document::parse(
            "<div><p>one <b>two <i>three</i></b> four</p><p>five</p><p><em>six</em> seven</p></div>",
        )
        .unwrap();
        let range = doc.find_text("hree fourfivesi").unwrap();
        let pieces = split_range(&doc, &range).unwrap();

        let joined: String = pieces.iter().map(|piece| piece.text(&doc)).collect();
        assert_eq!(joined, range.text(&doc));
        for piece in &pieces {
            assert_eq!(container_of(&doc, piece.start), container_of(&doc, piece.end));
        }
    }

    #[test]
    fn test_wrap_across_paragraphs() {
        let mut doc = Document::parse("<div><p>first para</p><p>second para</p></div>").unwrap();
        let range = doc.find_text("parasecond").unwrap();

        assert_eq!(apply(&mut doc, &range), 2);
        assert_eq!(
            doc.serialize().unwrap(),
            concat!(
                r#"<div><p>first <mark class="amnesia-highlight" data-annotation-id="a">para</mark></p>"#,
                r#"<p><mark class="amnesia-highlight" data-annotation-id="a">second</mark> para</p></div>"#
            )
        );
    }

    #[test]
    fn test_wrap_nested_start() {
        let mut doc = Document::parse("<p>a <b>bc <i>de</i> f</b> gh <u>ij</u></p>").unwrap();
        let range = doc.find_text("e f gh i").unwrap();
        let before = range.text(&doc);

        apply(&mut doc, &range);

        let marker = MarkerSpec::default();
        let marked: String = doc
            .descendants(doc.root())
            .filter(|&n| marker.is_marker(&doc, n))
            .map(|n| doc.text_content(n))
            .collect();
        assert_eq!(marked, before);
        assert_eq!(doc.text_content(doc.root()), "a bc de f gh ij");
    }

    #[test]
    fn test_detached_boundary() {
        let mut doc = Document::parse("<p>ab</p>").unwrap();
        let loose = doc.create_text("x");
        let ab = doc.children(doc.root())[0];
        let range = DomRange::new(Boundary::new(ab, 0), Boundary::new(loose, 1));
        assert_eq!(split_range(&doc, &range), Err(RangeError::Detached));
    }
}
