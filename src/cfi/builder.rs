//! CFI Builder
//!
//! Builds paths programmatically from 0-based spine/element/text indices.

use super::types::*;

/// Builder for constructing CFI paths
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    path: Path,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the step to the package spine (/6 in EPUB 3: metadata, manifest, spine)
    pub fn package_step(self) -> Self {
        self.step(6)
    }

    /// Add a spine item step (converts 0-based index to CFI format)
    /// CFI uses 1-based even numbering: index 0 -> /2, index 1 -> /4, etc.
    pub fn spine_item(self, index: usize) -> Self {
        self.element(index)
    }

    /// Add a spine item step with ID assertion
    pub fn spine_item_with_id(self, index: usize, id: impl Into<String>) -> Self {
        self.element_with_id(index, id)
    }

    /// Add an indirection step (entering a content document)
    pub fn indirection(mut self) -> Self {
        self.path.push(PathComponent::Indirection);
        self
    }

    /// Add an element step, 0-based: index 0 -> /2, index 1 -> /4.
    /// An index past the step range saturates to the largest even step,
    /// which resolution then reports as out of range.
    pub fn element(self, index: usize) -> Self {
        self.step(element_step(index).unwrap_or(u32::MAX - 1))
    }

    pub fn element_with_id(self, index: usize, id: impl Into<String>) -> Self {
        let mut builder = self.element(index);
        builder.path.push(PathComponent::id(id));
        builder
    }

    /// Add a text run step: the run after the `index`-th element, where
    /// index 0 is the leading run -> /1, 1 -> /3, etc.
    pub fn text_node(self, index: usize) -> Self {
        self.step(text_step(index).unwrap_or(u32::MAX))
    }

    /// Add a step with a raw CFI index
    pub fn step(mut self, cfi_index: u32) -> Self {
        self.path.push(PathComponent::Step(cfi_index));
        self
    }

    /// Set the character offset within the addressed text run
    pub fn character_offset(mut self, offset: u32) -> Self {
        self.path.set_character_offset(offset);
        self
    }

    pub fn build(self) -> Path {
        self.path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// CFI index of the `index`-th (0-based) element child, if it fits a step
pub fn element_step(index: usize) -> Option<u32> {
    let step = index.checked_add(1)?.checked_mul(2)?;
    u32::try_from(step).ok()
}

/// CFI index of the text run following the `index`-th element
/// (index 0 being the leading run), if it fits a step
pub fn text_step(index: usize) -> Option<u32> {
    let step = index.checked_mul(2)?.checked_add(1)?;
    u32::try_from(step).ok()
}
