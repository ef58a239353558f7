//! Annotation anchor service
//!
//! Creates annotations from live selections and re-applies them as
//! highlight markers when a chapter loads. Document, package and chapter
//! href are always passed in explicitly.

use std::ptr;

use tracing::{debug, info, warn};

use super::types::{Annotation, ApplyOutcome, ApplyReport, FailedAnnotation, Selection};
use crate::anchor::{
    normalize_boundary, split_range, Cursor, EncodeError, Encoder, Resolution, Resolved, Resolver,
};
use crate::cfi::{element_step, PathBuilder, Selector};
use crate::config::AnchorConfig;
use crate::dom::{surround_contents, Boundary, Document, DomRange, MarkerSpec, RangeError, Side};
use crate::error::{AnchorError, Result};
use crate::package::Package;

#[derive(Debug, Clone, Default)]
pub struct AnchorService {
    marker: MarkerSpec,
}

impl AnchorService {
    pub fn new(marker: MarkerSpec) -> Self {
        Self { marker }
    }

    pub fn from_config(config: &AnchorConfig) -> Self {
        Self::new(config.marker.clone())
    }

    pub fn marker(&self) -> &MarkerSpec {
        &self.marker
    }

    /// Encode a selection in the `spine_index`-th chapter as an annotation
    pub fn create_from_selection(
        &self,
        document: &Document,
        selection: &Selection,
        chapter_href: &str,
        spine_index: usize,
    ) -> Result<Annotation> {
        let range = selection.canonical().ok_or(AnchorError::EmptySelection)?;
        let start = normalize_boundary(document, range.start, Side::Start)?;
        let end = normalize_boundary(document, range.end, Side::End)?;

        let covered = DomRange::new(
            Boundary::new(start.node, start.offset.unwrap_or(0)),
            Boundary::new(end.node, end.offset.unwrap_or(0)),
        );
        if covered.start.text_offset(document) >= covered.end.text_offset(document) {
            return Err(AnchorError::EmptySelection);
        }

        element_step(spine_index).ok_or(EncodeError::IndexOverflow)?;
        let encoder = Encoder::new(document, &self.marker);
        let prefix = PathBuilder::new()
            .package_step()
            .spine_item(spine_index)
            .indirection()
            .build();
        let selector = Selector::from_endpoints(
            &prefix.join(&encoder.encode(start)?),
            &prefix.join(&encoder.encode(end)?),
        );

        debug!(%selector, chapter_href, "Created annotation selector");
        Ok(Annotation::new(chapter_href, selector))
    }

    /// Create an annotation over the first occurrence of `quote`
    pub fn create_from_quote(
        &self,
        document: &Document,
        quote: &str,
        chapter_href: &str,
        spine_index: usize,
    ) -> Result<Annotation> {
        let range = document
            .find_text(quote)
            .ok_or_else(|| AnchorError::QuoteNotFound(quote.to_string()))?;
        self.create_from_selection(document, &range.into(), chapter_href, spine_index)
    }

    /// Highlight one annotation in a loaded chapter.
    ///
    /// Resolution starts at `package`'s tree; an annotation whose
    /// indirection leads elsewhere is reported as not applicable and leaves
    /// the chapter untouched.
    pub fn apply(
        &self,
        annotation: &Annotation,
        package: &Package,
        chapter: &mut Document,
        chapter_href: &str,
    ) -> Result<ApplyOutcome> {
        if !annotation.selector().is_range() {
            return Err(AnchorError::NotARange);
        }

        let range = {
            let loaded: &Document = chapter;
            let resolver = Resolver::new(package, &self.marker).with_chapter(chapter_href, loaded);
            match resolver.resolve_selector(annotation.selector(), Cursor::root(package.document())) {
                Resolution::Found(Resolved::Range { start, end }) => {
                    if !ptr::eq(start.document(), loaded) || !ptr::eq(end.document(), loaded) {
                        return Err(AnchorError::OutsideChapter);
                    }
                    DomRange::new(
                        start.boundary(Side::Start).ok_or(RangeError::Detached)?,
                        end.boundary(Side::End).ok_or(RangeError::Detached)?,
                    )
                }
                Resolution::Found(Resolved::Point(_)) => return Err(AnchorError::NotARange),
                Resolution::WrongDocument { href } => {
                    debug!(id = annotation.id(), %href, "Annotation belongs to another chapter");
                    return Ok(ApplyOutcome::NotApplicable { href });
                }
                Resolution::Invalid(error) => return Err(error.into()),
            }
        };

        let pieces = split_range(chapter, &range)?;
        let mut fragments = 0;
        // Back to front keeps the earlier pieces' offsets valid
        for piece in pieces.iter().rev() {
            let wrapped = surround_contents(chapter, piece, |doc| {
                self.marker.create_marker(doc, annotation.id())
            })?;
            if wrapped.is_some() {
                fragments += 1;
            }
        }

        debug!(id = annotation.id(), fragments, "Applied annotation");
        Ok(ApplyOutcome::Applied { fragments })
    }

    /// Apply every annotation independently. Failures are logged and
    /// collected; they never stop the batch.
    ///
    /// Call once per chapter load: applying the same annotation twice
    /// wraps its text twice.
    pub fn apply_all(
        &self,
        annotations: &[Annotation],
        package: &Package,
        chapter: &mut Document,
        chapter_href: &str,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for annotation in annotations {
            match self.apply(annotation, package, chapter, chapter_href) {
                Ok(ApplyOutcome::Applied { fragments }) => {
                    report.applied += 1;
                    report.fragments += fragments;
                }
                Ok(ApplyOutcome::NotApplicable { .. }) => report.not_applicable += 1,
                Err(error) => {
                    warn!(id = annotation.id(), %error, "Skipping annotation");
                    report.failed.push(FailedAnnotation {
                        id: annotation.id().to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            chapter_href,
            applied = report.applied,
            fragments = report.fragments,
            not_applicable = report.not_applicable,
            failed = report.failed.len(),
            "Applied annotations"
        );
        report
    }
}
