//! Annotation types
//!
//! An annotation is created once from a selection and never changes
//! afterwards; it is re-anchored every time its chapter loads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cfi::Selector;
use crate::dom::DomRange;

/// An anchored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Unique identifier (UUID)
    id: String,
    /// Chapter href the annotation was made in
    source: String,
    selector: Selector,
    /// Opaque payload (note text, color, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(source: impl Into<String>, selector: Selector) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            selector,
            body: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A live selection. Existing highlights can fragment a selection into
/// several ranges; the first one is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub ranges: Vec<DomRange>,
}

impl Selection {
    pub fn new(range: DomRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    pub fn canonical(&self) -> Option<&DomRange> {
        self.ranges.first()
    }
}

impl From<DomRange> for Selection {
    fn from(range: DomRange) -> Self {
        Self::new(range)
    }
}

/// Result of applying one annotation to a chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Highlighted with this many marker elements
    Applied { fragments: usize },
    /// The annotation belongs to another chapter
    NotApplicable { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAnnotation {
    pub id: String,
    pub error: String,
}

/// Summary of a batch application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Annotations highlighted in this chapter
    pub applied: usize,
    /// Marker elements inserted
    pub fragments: usize,
    pub not_applicable: usize,
    pub failed: Vec<FailedAnnotation>,
}
