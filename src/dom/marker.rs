//! Highlight markers
//!
//! Markers are rendering-only wrapper elements. They must not shift the
//! structural indices that paths are built on, so indexing goes through
//! [`MarkerSpec::logical_children`], which looks through them.

use serde::{Deserialize, Serialize};

use super::document::{Document, NodeData, NodeId};

/// Which elements count as highlight markers and how new ones are built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSpec {
    /// Element name of the wrapper
    pub tag: String,
    /// Class token identifying our wrappers; `None` matches every `tag`
    /// element
    pub class: Option<String>,
    /// Attribute carrying the annotation id on each wrapper
    pub annotation_attribute: String,
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            tag: "mark".to_string(),
            class: Some("amnesia-highlight".to_string()),
            annotation_attribute: "data-annotation-id".to_string(),
        }
    }
}

impl MarkerSpec {
    /// Structural marker test: element name plus class token
    pub fn is_marker(&self, doc: &Document, node: NodeId) -> bool {
        if doc.local_name(node) != Some(self.tag.as_str()) {
            return false;
        }
        match &self.class {
            Some(class) => doc
                .attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            None => true,
        }
    }

    /// Children of `parent` as seen by path indexing: markers are replaced
    /// by their own logical children, comments are skipped
    pub fn logical_children(&self, doc: &Document, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_logical(doc, parent, &mut out);
        out
    }

    fn collect_logical(&self, doc: &Document, parent: NodeId, out: &mut Vec<NodeId>) {
        for &child in doc.children(parent) {
            match doc.node(child).data {
                NodeData::Comment(_) => {}
                NodeData::Element { .. } if self.is_marker(doc, child) => {
                    self.collect_logical(doc, child, out)
                }
                _ => out.push(child),
            }
        }
    }

    /// Nearest ancestor that is not a marker
    pub fn logical_parent(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        doc.ancestors(node).find(|&a| !self.is_marker(doc, a))
    }

    /// Create a detached marker element for an annotation
    pub fn create_marker(&self, doc: &mut Document, annotation_id: &str) -> NodeId {
        let mut attributes = Vec::new();
        if let Some(class) = &self.class {
            attributes.push(("class".to_string(), class.clone()));
        }
        attributes.push((self.annotation_attribute.clone(), annotation_id.to_string()));
        doc.create_element(&self.tag, attributes)
    }
}
