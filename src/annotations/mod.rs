//! Annotation module
//!
//! Immutable annotations anchored by CFI selectors, and the service that
//! creates them from selections and re-applies them as highlights.

mod service;
mod types;

pub use service::AnchorService;
pub use types::{Annotation, ApplyOutcome, ApplyReport, FailedAnnotation, Selection};
