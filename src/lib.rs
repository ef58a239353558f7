//! Amnesia Anchor
//!
//! Anchors annotations to positions inside EPUB chapters and re-locates them
//! when a chapter is loaded again.
//!
//! # Modules
//!
//! - `cfi`: Portable selector paths and their `epubcfi(...)` form
//! - `dom`: Arena XHTML tree, highlight markers and ranges
//! - `anchor`: Encoder, resolver and range splitter
//! - `package`: OPF manifest and spine lookup
//! - `annotations`: Annotation values and the anchor service

pub mod anchor;
pub mod annotations;
pub mod cfi;
pub mod config;
pub mod dom;
pub mod error;
pub mod package;

pub use annotations::{AnchorService, Annotation, ApplyOutcome, ApplyReport, Selection};
pub use config::AnchorConfig;
pub use error::{AnchorError, Result};
pub use package::{Manifest, Package};
