//! Configuration management for annotation anchoring

use serde::Deserialize;
use std::env;

use crate::dom::MarkerSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    /// Highlight marker elements
    pub marker: MarkerSpec,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig {
            marker: MarkerSpec::default(),
            log_filter: "amnesia_anchor=info".to_string(),
        }
    }
}

impl AnchorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their
    /// defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        AnchorConfig {
            marker: MarkerSpec {
                tag: lookup("ANCHOR_MARKER_TAG").unwrap_or(defaults.marker.tag),
                // An empty class matches every marker tag
                class: match lookup("ANCHOR_MARKER_CLASS") {
                    Some(class) if class.trim().is_empty() => None,
                    Some(class) => Some(class),
                    None => defaults.marker.class,
                },
                annotation_attribute: lookup("ANCHOR_ANNOTATION_ATTRIBUTE")
                    .unwrap_or(defaults.marker.annotation_attribute),
            },
            log_filter: lookup("ANCHOR_LOG").unwrap_or(defaults.log_filter),
        }
    }
}
