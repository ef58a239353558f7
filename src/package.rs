//! Package document model
//!
//! The OPF package is the tree every selector starts from: `/6` is the
//! spine, `/6/N` an itemref, and `!` follows the itemref's `idref` through
//! the manifest into a content document.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::Document;
use crate::error::Result;

/// Manifest lookup: idref -> content document href
pub trait Manifest {
    fn href(&self, idref: &str) -> Option<&str>;
}

impl Manifest for HashMap<String, String> {
    fn href(&self, idref: &str) -> Option<&str> {
        self.get(idref).map(String::as_str)
    }
}

/// Manifest item from the OPF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    /// Unique ID within the EPUB
    pub id: String,
    /// Resource href, relative to the package document
    pub href: String,
    /// MIME type
    pub media_type: String,
    /// Optional properties (nav, cover-image, etc.)
    pub properties: Option<String>,
}

/// A parsed package document
#[derive(Debug, Clone)]
pub struct Package {
    document: Document,
    manifest: Vec<ManifestItem>,
    spine: Vec<String>,
}

impl Package {
    pub fn parse(opf: &str) -> Result<Self> {
        let document = Document::parse(opf)?;
        let mut manifest = Vec::new();
        let mut spine = Vec::new();

        for node in document.descendants(document.root()) {
            let parent = document.parent(node).and_then(|p| document.local_name(p));
            match (parent, document.local_name(node)) {
                (Some("manifest"), Some("item")) => {
                    let attr = |key: &str| document.attribute(node, key).map(str::to_string);
                    let (Some(id), Some(href)) = (attr("id"), attr("href")) else {
                        continue;
                    };
                    manifest.push(ManifestItem {
                        id,
                        href,
                        media_type: attr("media-type").unwrap_or_default(),
                        properties: attr("properties"),
                    });
                }
                (Some("spine"), Some("itemref")) => {
                    if let Some(idref) = document.attribute(node, "idref") {
                        spine.push(idref.to_string());
                    }
                }
                _ => {}
            }
        }

        tracing::debug!(
            items = manifest.len(),
            spine = spine.len(),
            "Parsed package document"
        );

        Ok(Self {
            document,
            manifest,
            spine,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// The package tree selectors are resolved from
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn items(&self) -> &[ManifestItem] {
        &self.manifest
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn spine_len(&self) -> usize {
        self.spine.len()
    }

    /// Href of the `index`-th spine item
    pub fn spine_href(&self, index: usize) -> Option<&str> {
        self.spine
            .get(index)
            .and_then(|idref| self.href(idref))
    }

    /// Get spine index for a given href
    pub fn spine_index(&self, href: &str) -> Option<usize> {
        (0..self.spine.len()).find(|&i| self.spine_href(i) == Some(href))
    }
}

impl Manifest for Package {
    fn href(&self, idref: &str) -> Option<&str> {
        self.item(idref).map(|item| item.href.as_str())
    }
}
