//! CFI (Canonical Fragment Identifier) module for EPUB
//!
//! The portable half of annotation anchoring: the path model, its textual
//! `epubcfi(...)` form and a builder.
//!
//! # Example CFI
//!
//! ```text
//! epubcfi(/6/4[chapter1]!/4/2/1:42)
//!         │  │          │ │ │ │ └── character offset 42
//!         │  │          │ │ │ └──── text run (odd = text)
//!         │  │          │ │ └────── element index
//!         │  │          │ └──────── element index (body)
//!         │  │          └────────── indirection (into content doc)
//!         │  └───────────────────── spine item with ID assertion
//!         └──────────────────────── spine element
//! ```

mod builder;
mod parser;
mod types;

pub use builder::{element_step, text_step, PathBuilder};
pub use parser::{parse, try_parse, CfiParseError};
pub use types::{Assertion, Offset, Path, PathComponent, PathRange, Selector};
