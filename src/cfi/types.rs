//! CFI (Canonical Fragment Identifier) types for EPUB
//!
//! A CFI addresses a position inside a publication as a structural path:
//! element/text steps, id assertions and indirections into referenced
//! documents, optionally ending in a character offset.
//! Format: epubcfi(/6/4[chap01ref]!/4/2/22/3:268)
//!
//! These types are the persisted selector representation. Their serde form
//! is a plain tagged-variant tree (`{"type": "Step", "value": 4}`).
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete selector: one path, or a shared path with a from/to pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// The shared path (for ranges, the common ancestor prefix)
    pub path: Path,
    /// Optional range tails (for selections)
    pub range: Option<PathRange>,
}

/// Range tails, each relative to the end of the selector's shared path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRange {
    pub from: Path,
    pub to: Path,
}

/// An ordered sequence of path components with an optional terminal offset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub components: Vec<PathComponent>,
    pub offset: Option<Offset>,
}

/// A single component of a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PathComponent {
    /// Child step. Even indices address elements, odd indices text runs.
    Step(u32),
    /// Assertion about the node addressed by the preceding step
    Assertion(Assertion),
    /// Step into the document referenced by the current node (`!`)
    Indirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Assertion {
    Id(String),
}

/// Terminal offset within the addressed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Offset {
    /// Character offset within a text run (Unicode scalar values)
    Character(u32),
}

impl Selector {
    /// Create a point selector
    pub fn new(path: Path) -> Self {
        Self { path, range: None }
    }

    /// Create a ranged selector
    pub fn with_range(path: Path, from: Path, to: Path) -> Self {
        Self {
            path,
            range: Some(PathRange { from, to }),
        }
    }

    /// Build a ranged selector from two absolute paths, factoring out
    /// their shared prefix
    pub fn from_endpoints(start: &Path, end: &Path) -> Self {
        let (prefix, from, to) = Path::split_common_prefix(start, end);
        Self::with_range(prefix, from, to)
    }

    /// Check if this selector represents a range (text selection)
    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }

    /// Get the spine index if the path starts with the standard `/6/N` prefix
    pub fn spine_index(&self) -> Option<u32> {
        let mut steps = self.path.components.iter().filter_map(PathComponent::step);
        match (steps.next(), steps.next()) {
            // CFI uses 1-based even numbering: 2, 4, 6, 8...
            (Some(6), Some(n)) if n >= 2 && n % 2 == 0 => Some(n / 2 - 1),
            _ => None,
        }
    }
}

impl Path {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path from components
    pub fn with_components(components: Vec<PathComponent>) -> Self {
        Self {
            components,
            offset: None,
        }
    }

    pub fn push(&mut self, component: PathComponent) {
        self.components.push(component);
    }

    pub fn set_character_offset(&mut self, offset: u32) {
        self.offset = Some(Offset::Character(offset));
    }

    pub fn character_offset(&self) -> Option<u32> {
        self.offset.map(|Offset::Character(n)| n)
    }

    /// Iterate over the step indices only
    pub fn steps(&self) -> impl Iterator<Item = u32> + '_ {
        self.components.iter().filter_map(PathComponent::step)
    }

    /// Position of the last component that moves the cursor (a step or an
    /// indirection). Assertions after it still apply to its target.
    pub fn last_movement(&self) -> Option<usize> {
        self.components
            .iter()
            .rposition(|c| !matches!(c, PathComponent::Assertion(_)))
    }

    /// Append another path's components and take over its offset
    pub fn join(&self, tail: &Path) -> Path {
        let mut components = self.components.clone();
        components.extend(tail.components.iter().cloned());
        Path {
            components,
            offset: tail.offset,
        }
    }

    /// Split two absolute paths into `(shared prefix, tail of a, tail of b)`.
    ///
    /// The prefix never swallows the final step of either path, so both
    /// tails always start with a step. Assertions travel with the step
    /// they follow.
    pub fn split_common_prefix(a: &Path, b: &Path) -> (Path, Path, Path) {
        let limit = match (a.last_step_position(), b.last_step_position()) {
            (Some(x), Some(y)) => x.min(y),
            _ => 0,
        };

        let mut shared = 0;
        while shared < limit && a.components[shared] == b.components[shared] {
            shared += 1;
        }
        // Never end the prefix between a step and its assertions
        while shared > 0 && matches!(a.components.get(shared), Some(PathComponent::Assertion(_))) {
            shared -= 1;
            while shared > 0 && matches!(a.components[shared], PathComponent::Assertion(_)) {
                shared -= 1;
            }
        }

        let prefix = Path::with_components(a.components[..shared].to_vec());
        let tail_a = Path {
            components: a.components[shared..].to_vec(),
            offset: a.offset,
        };
        let tail_b = Path {
            components: b.components[shared..].to_vec(),
            offset: b.offset,
        };
        (prefix, tail_a, tail_b)
    }

    fn last_step_position(&self) -> Option<usize> {
        self.components
            .iter()
            .rposition(|c| matches!(c, PathComponent::Step(_)))
    }
}

impl PathComponent {
    /// Get the index if this is a step
    pub fn step(&self) -> Option<u32> {
        match self {
            PathComponent::Step(n) => Some(*n),
            _ => None,
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        PathComponent::Assertion(Assertion::Id(value.into()))
    }
}

// Display implementations for serialization

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({}", self.path)?;
        if let Some(ref range) = self.range {
            write!(f, ",{},{}", range.from, range.to)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "{}", component)?;
        }
        if let Some(Offset::Character(n)) = self.offset {
            write!(f, ":{}", n)?;
        }
        Ok(())
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Step(n) => write!(f, "/{}", n),
            PathComponent::Indirection => write!(f, "!"),
            PathComponent::Assertion(Assertion::Id(id)) => {
                write!(f, "[")?;
                for ch in id.chars() {
                    if matches!(ch, '^' | '[' | ']' | '(' | ')' | ',' | ';' | '=') {
                        write!(f, "^")?;
                    }
                    write!(f, "{}", ch)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(components: Vec<PathComponent>, offset: Option<u32>) -> Path {
        Path {
            components,
            offset: offset.map(Offset::Character),
        }
    }

    #[test]
    fn test_simple_display() {
        let selector = Selector::new(Path::with_components(vec![
            PathComponent::Step(6),
            PathComponent::Step(4),
            PathComponent::Indirection,
            PathComponent::Step(4),
            PathComponent::Step(2),
        ]));

        assert_eq!(selector.to_string(), "epubcfi(/6/4!/4/2)");
    }

    #[test]
    fn test_display_with_id_and_offset() {
        let selector = Selector::new(path(
            vec![
                PathComponent::Step(6),
                PathComponent::Step(4),
                PathComponent::id("chapter1"),
                PathComponent::Indirection,
                PathComponent::Step(4),
                PathComponent::Step(1),
            ],
            Some(42),
        ));

        assert_eq!(selector.to_string(), "epubcfi(/6/4[chapter1]!/4/1:42)");
    }

    #[test]
    fn test_display_escapes_assertion() {
        let component = PathComponent::id("a]b,c");
        assert_eq!(component.to_string(), "[a^]b^,c]");
    }

    #[test]
    fn test_spine_index_extraction() {
        let selector = Selector::new(Path::with_components(vec![
            PathComponent::Step(6),
            PathComponent::Step(4),
            PathComponent::Indirection,
        ]));
        assert_eq!(selector.spine_index(), Some(1));

        let not_spine = Selector::new(Path::with_components(vec![PathComponent::Step(4)]));
        assert_eq!(not_spine.spine_index(), None);
    }

    #[test]
    fn test_split_common_prefix_keeps_final_steps() {
        let start = path(
            vec![
                PathComponent::Step(4),
                PathComponent::Step(2),
                PathComponent::id("p1"),
                PathComponent::Step(1),
            ],
            Some(0),
        );
        let end = path(
            vec![
                PathComponent::Step(4),
                PathComponent::Step(2),
                PathComponent::id("p1"),
                PathComponent::Step(1),
            ],
            Some(5),
        );

        let (prefix, from, to) = Path::split_common_prefix(&start, &end);
        assert_eq!(prefix.to_string(), "/4/2[p1]");
        assert_eq!(from.to_string(), "/1:0");
        assert_eq!(to.to_string(), "/1:5");
        assert_eq!(prefix.join(&from), start);
        assert_eq!(prefix.join(&to), end);
    }

    #[test]
    fn test_split_common_prefix_diverging_elements() {
        let start = path(
            vec![PathComponent::Step(4), PathComponent::Step(2), PathComponent::Step(1)],
            Some(3),
        );
        let end = path(
            vec![PathComponent::Step(4), PathComponent::Step(4), PathComponent::Step(1)],
            Some(2),
        );

        let (prefix, from, to) = Path::split_common_prefix(&start, &end);
        assert_eq!(prefix.to_string(), "/4");
        assert_eq!(from.to_string(), "/2/1:3");
        assert_eq!(to.to_string(), "/4/1:2");
    }

    #[test]
    fn test_split_does_not_strand_assertion() {
        // Same step index, different id: the step must stay with its assertion
        let start = Path::with_components(vec![
            PathComponent::Step(4),
            PathComponent::Step(2),
            PathComponent::id("a"),
            PathComponent::Step(1),
        ]);
        let end = Path::with_components(vec![
            PathComponent::Step(4),
            PathComponent::Step(2),
            PathComponent::id("b"),
            PathComponent::Step(1),
        ]);

        let (prefix, from, _) = Path::split_common_prefix(&start, &end);
        assert_eq!(prefix.to_string(), "/4");
        assert_eq!(from.to_string(), "/2[a]/1");
    }

    #[test]
    fn test_serde_tagged_form() {
        let p = path(vec![PathComponent::Step(4), PathComponent::Indirection], Some(7));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "components": [
                    {"type": "Step", "value": 4},
                    {"type": "Indirection"}
                ],
                "offset": {"type": "Character", "value": 7}
            })
        );
    }
}
