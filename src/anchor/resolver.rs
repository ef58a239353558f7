//! Resolver: portable path + starting cursor -> live cursor
//!
//! Resolution is a single fold over the path's components. Stepping
//! through an indirection into a document other than the loaded chapter
//! ends the fold with [`Resolution::WrongDocument`], which callers treat
//! as "not here" rather than as a failure.

use thiserror::Error;
use tracing::debug;

use super::cursor::Cursor;
use crate::cfi::{Assertion, Path, PathComponent, Selector};
use crate::dom::{Document, MarkerSpec, NodeId};
use crate::package::Manifest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Step /{0} does not address a node")]
    InvalidIndex(u32),

    #[error("Text step without a character offset")]
    MissingOffset,

    #[error("Offset {offset} out of range for text run of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Expected id {expected:?}, found {found:?}")]
    IdMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("Indirection from a node without idref")]
    MissingIdref,

    #[error("No manifest entry for idref {0:?}")]
    MissingManifestEntry(String),
}

/// Outcome of resolving a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Found(T),
    /// The path leads into a document other than the one loaded
    WrongDocument { href: String },
    Invalid(ResolveError),
}

impl<T> Resolution<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        self.and_then(|value| Resolution::Found(f(value)))
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Resolution<U>) -> Resolution<U> {
        match self {
            Resolution::Found(value) => f(value),
            Resolution::WrongDocument { href } => Resolution::WrongDocument { href },
            Resolution::Invalid(error) => Resolution::Invalid(error),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ResolveError>> for Resolution<T> {
    fn from(result: Result<T, ResolveError>) -> Self {
        match result {
            Ok(value) => Resolution::Found(value),
            Err(error) => Resolution::Invalid(error),
        }
    }
}

/// A resolved selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    Point(Cursor<'a>),
    Range { start: Cursor<'a>, end: Cursor<'a> },
}

#[derive(Clone, Copy)]
struct Chapter<'a> {
    href: &'a str,
    document: &'a Document,
}

pub struct Resolver<'a> {
    manifest: &'a dyn Manifest,
    marker: &'a MarkerSpec,
    chapter: Option<Chapter<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new(manifest: &'a dyn Manifest, marker: &'a MarkerSpec) -> Self {
        Self {
            manifest,
            marker,
            chapter: None,
        }
    }

    /// The content document indirections are allowed to enter
    pub fn with_chapter(mut self, href: &'a str, document: &'a Document) -> Self {
        self.chapter = Some(Chapter { href, document });
        self
    }

    /// Resolve a path starting at `start`
    pub fn resolve(&self, path: &Path, start: Cursor<'a>) -> Resolution<Cursor<'a>> {
        let last_movement = path.last_movement();
        let mut cursor = start;

        for (position, component) in path.components.iter().enumerate() {
            cursor = match component {
                PathComponent::Step(index) => {
                    let step = if last_movement == Some(position) {
                        self.final_step(cursor, *index, path)
                    } else {
                        self.element_step(cursor, *index)
                    };
                    match step {
                        Ok(next) => next,
                        Err(error) => return Resolution::Invalid(error),
                    }
                }
                PathComponent::Assertion(Assertion::Id(expected)) => {
                    let found = cursor.document().id(cursor.node());
                    if found != Some(expected.as_str()) {
                        return Resolution::Invalid(ResolveError::IdMismatch {
                            expected: expected.clone(),
                            found: found.map(str::to_string),
                        });
                    }
                    cursor
                }
                PathComponent::Indirection => match self.indirect(cursor) {
                    Resolution::Found(next) => next,
                    other => return other,
                },
            };
        }

        Resolution::Found(cursor)
    }

    /// Resolve a selector's shared path once, then both range tails from
    /// the shared cursor
    pub fn resolve_selector(&self, selector: &Selector, start: Cursor<'a>) -> Resolution<Resolved<'a>> {
        self.resolve(&selector.path, start)
            .and_then(|shared| match &selector.range {
                None => Resolution::Found(Resolved::Point(shared)),
                Some(range) => self.resolve(&range.from, shared).and_then(|from| {
                    self.resolve(&range.to, shared)
                        .map(|to| Resolved::Range { start: from, end: to })
                }),
            })
    }

    /// Even step: the `index/2 - 1`'th element among logical children
    fn element_step(&self, cursor: Cursor<'a>, index: u32) -> Result<Cursor<'a>, ResolveError> {
        if index % 2 == 1 {
            // Text runs have no children to descend into
            return Err(ResolveError::InvalidIndex(index));
        }
        let doc = cursor.document();
        let element = (index / 2)
            .checked_sub(1)
            .and_then(|k| {
                self.marker
                    .logical_children(doc, cursor.node())
                    .into_iter()
                    .filter(|&c| doc.is_element(c))
                    .nth(k as usize)
            })
            .ok_or(ResolveError::InvalidIndex(index))?;
        Ok(cursor.descend(element))
    }

    fn final_step(&self, cursor: Cursor<'a>, index: u32, path: &Path) -> Result<Cursor<'a>, ResolveError> {
        if index % 2 == 0 {
            return self.element_step(cursor, index);
        }

        let doc = cursor.document();
        let run = self
            .text_run(doc, cursor.node(), (index / 2) as usize)
            .ok_or(ResolveError::InvalidIndex(index))?;
        let offset = path.character_offset().ok_or(ResolveError::MissingOffset)? as usize;

        let mut remaining = offset;
        for &node in &run {
            let len = doc.text_len(node);
            if remaining < len {
                return Ok(cursor.descend(node).with_offset(remaining));
            }
            remaining -= len;
        }

        // The very end of the run stays on its last node
        match run.last() {
            Some(&last) if remaining == 0 => Ok(cursor.descend(last).with_offset(doc.text_len(last))),
            _ => Err(ResolveError::OffsetOutOfRange {
                offset,
                len: offset - remaining,
            }),
        }
    }

    /// Text nodes following the `elements_before`'th element child (or
    /// leading the parent when zero), markers looked through
    fn text_run(&self, doc: &Document, parent: NodeId, elements_before: usize) -> Option<Vec<NodeId>> {
        let children = self.marker.logical_children(doc, parent);
        let start = match elements_before {
            0 => 0,
            k => {
                children
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| doc.is_element(**c))
                    .nth(k - 1)?
                    .0
                    + 1
            }
        };
        let run: Vec<NodeId> = children[start..]
            .iter()
            .copied()
            .take_while(|&c| doc.is_text(c))
            .collect();
        (!run.is_empty()).then_some(run)
    }

    fn indirect(&self, cursor: Cursor<'a>) -> Resolution<Cursor<'a>> {
        let Some(idref) = cursor.document().attribute(cursor.node(), "idref") else {
            return Resolution::Invalid(ResolveError::MissingIdref);
        };
        let Some(href) = self.manifest.href(idref) else {
            return Resolution::Invalid(ResolveError::MissingManifestEntry(idref.to_string()));
        };

        match self.chapter {
            Some(chapter) if chapter.href == href => Resolution::Found(cursor.enter_document(chapter.document)),
            _ => {
                debug!(idref, href, "Indirection leads to another document");
                Resolution::WrongDocument {
                    href: href.to_string(),
                }
            }
        }
    }
}
