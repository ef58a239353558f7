//! Document tree module
//!
//! Provides the tree capability annotation anchoring runs against:
//! - Arena-backed XHTML/XML documents parsed with quick-xml
//! - Marker-aware (highlight-transparent) child indexing
//! - DOM-style ranges and content wrapping

mod document;
mod marker;
mod range;

pub use document::{Descendants, Document, Node, NodeData, NodeId};
pub use marker::MarkerSpec;
pub use range::{common_ancestor, surround_contents, Boundary, DomRange, RangeError, Side};
