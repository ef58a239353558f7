//! Error types for annotation anchoring

use thiserror::Error;

use crate::anchor::{EncodeError, ResolveError};
use crate::cfi::CfiParseError;
use crate::dom::RangeError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AnchorError>;

#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Invalid CFI: {0}")]
    Cfi(#[from] CfiParseError),

    #[error("Failed to encode position: {0}")]
    Encode(#[from] EncodeError),

    #[error("Failed to resolve selector: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Selection is empty")]
    EmptySelection,

    #[error("Quote not found in document: {0:?}")]
    QuoteNotFound(String),

    #[error("Selector does not lead into the chapter document")]
    OutsideChapter,

    #[error("Selector is a point, there is no range to highlight")]
    NotARange,
}
