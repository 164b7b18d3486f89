//! Server profile resolved at connect time

use crate::config::GenerationMarkers;
use serde::{Deserialize, Serialize};

/// Hardware/firmware generation of the managed server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Legacy,
    Mid,
    Newest,
}

impl Generation {
    /// Classify purely from the product name
    pub fn classify(product_name: &str, markers: &GenerationMarkers) -> Self {
        if markers.newest.iter().any(|m| product_name.contains(m.as_str())) {
            Generation::Newest
        } else if markers.mid.iter().any(|m| product_name.contains(m.as_str())) {
            Generation::Mid
        } else {
            Generation::Legacy
        }
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generation::Legacy => write!(f, "legacy"),
            Generation::Mid => write!(f, "mid"),
            Generation::Newest => write!(f, "newest"),
        }
    }
}

/// Whether the legacy protocol answered the cold-start probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyState {
    Enabled,
    Disabled,
    NotProbed,
}

/// Everything routing needs to know about a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub product_name: String,
    pub generation: Generation,
    pub legacy: LegacyState,
    /// Only the standardized protocol may be used
    pub standard_only: bool,
}

impl ServerProfile {
    /// Profile of a server the legacy protocol answered for
    pub fn probed(product_name: impl Into<String>, markers: &GenerationMarkers) -> Self {
        let product_name = product_name.into();
        let generation = Generation::classify(&product_name, markers);
        Self {
            product_name,
            generation,
            legacy: LegacyState::Enabled,
            standard_only: false,
        }
    }

    /// Profile of a newest-generation server whose legacy protocol is off
    pub fn legacy_disabled(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            generation: Generation::Newest,
            legacy: LegacyState::Disabled,
            standard_only: false,
        }
    }

    /// Profile of a server forced onto the standardized protocol
    pub fn standard_only(product_name: impl Into<String>, markers: &GenerationMarkers) -> Self {
        let product_name = product_name.into();
        let generation = Generation::classify(&product_name, markers);
        Self {
            product_name,
            generation,
            legacy: LegacyState::NotProbed,
            standard_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_generations() {
        let markers = GenerationMarkers::default();
        assert_eq!(
            Generation::classify("ProLiant DL380 Gen10", &markers),
            Generation::Newest
        );
        assert_eq!(
            Generation::classify("ProLiant BL460c Gen9", &markers),
            Generation::Mid
        );
        assert_eq!(
            Generation::classify("ProLiant DL360 G7", &markers),
            Generation::Legacy
        );
    }

    #[test]
    fn test_custom_markers() {
        let markers = GenerationMarkers {
            newest: vec!["Gen10".into(), "Gen11".into()],
            mid: vec!["Gen9".into()],
        };
        assert_eq!(
            Generation::classify("ProLiant DL380 Gen11", &markers),
            Generation::Newest
        );
    }

    #[test]
    fn test_legacy_disabled_profile_is_newest() {
        let profile = ServerProfile::legacy_disabled("ProLiant DL325");
        assert_eq!(profile.generation, Generation::Newest);
        assert_eq!(profile.legacy, LegacyState::Disabled);
        assert!(!profile.standard_only);
    }
}
