//! Anchor engine
//!
//! Turns live positions into portable paths and back:
//! - [`Encoder`]: position -> path, indexed over marker-transparent children
//! - [`Resolver`]: path -> cursor, following indirections through a manifest
//! - [`split_range`]: cross-element range -> wrappable sub-ranges

mod cursor;
mod encoder;
mod resolver;
mod splitter;

pub use cursor::{Cursor, Position};
pub use encoder::{normalize_boundary, EncodeError, Encoder};
pub use resolver::{Resolution, Resolved, ResolveError, Resolver};
pub use splitter::split_range;
