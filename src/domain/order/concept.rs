use serde::{Deserialize, Serialize};

use crate::config::AmbiguityPolicy;
use super::errors::{AmbiguityWarning, OrderEntryError, OrderEntryResult};
use super::value_objects::ConceptUuid;

// ============================================================================
// Concept Resolver
// ============================================================================

/// A concept or drug the provider can pick from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub uuid: ConceptUuid,
    pub display: String,
}

impl Concept {
    pub fn new(uuid: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            uuid: ConceptUuid::new(uuid),
            display: display.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub uuid: ConceptUuid,
    pub warning: Option<AmbiguityWarning>,
}

/// Resolve `display_name` against `candidates` with the default first-match policy.
pub fn resolve_uuid(candidates: &[Concept], display_name: &str) -> OrderEntryResult<Resolution> {
    resolve_uuid_with(candidates, display_name, AmbiguityPolicy::FirstMatch)
}

/// Case-insensitive display-name lookup.
///
/// A single match resolves cleanly. Several matches are reported as an
/// `AmbiguityWarning`; `policy` decides whether the first one is still used.
pub fn resolve_uuid_with(
    candidates: &[Concept],
    display_name: &str,
    policy: AmbiguityPolicy,
) -> OrderEntryResult<Resolution> {
    let wanted = display_name.to_lowercase();
    let matches: Vec<&Concept> = candidates
        .iter()
        .filter(|c| c.display.to_lowercase() == wanted)
        .collect();

    match matches.as_slice() {
        [] => Err(OrderEntryError::NotFound(display_name.to_string())),
        [only] => Ok(Resolution {
            uuid: only.uuid.clone(),
            warning: None,
        }),
        [first, ..] => {
            let warning = AmbiguityWarning {
                display_name: display_name.to_string(),
                matches: matches.iter().map(|c| c.uuid.clone()).collect(),
            };

            tracing::warn!(
                display_name = %display_name,
                match_count = warning.matches.len(),
                policy = ?policy,
                "Ambiguous concept display name"
            );

            match policy {
                AmbiguityPolicy::FirstMatch => Ok(Resolution {
                    uuid: first.uuid.clone(),
                    warning: Some(warning),
                }),
                AmbiguityPolicy::Reject => Err(OrderEntryError::Ambiguous(warning)),
            }
        }
    }
}
