//! Grouping specs: the inbound edges of a bolt.
//!
//! YAML shape (one single-key mapping per edge, key = grouping kind):
//!   groupings:
//!     - shuffle_grouping: sentences          # shorthand: source name only
//!     - fields_grouping:
//!         component: words
//!         stream: default                    # optional
//!         fields: [word]

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stream id used when a grouping or output schema does not name one.
pub const DEFAULT_STREAM: &str = "default";

/// Distribution strategy of a grouping edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "fields", rename_all = "snake_case")]
pub enum Grouping {
    Shuffle,
    Global,
    Fields(Vec<String>),
    LocalOrShuffle,
    None,
    All,
}

impl Grouping {
    /// Document key for this grouping kind.
    pub fn key(&self) -> &'static str {
        match self {
            Grouping::Shuffle => "shuffle_grouping",
            Grouping::Global => "global_grouping",
            Grouping::Fields(_) => "fields_grouping",
            Grouping::LocalOrShuffle => "local_or_shuffle_grouping",
            Grouping::None => "none_grouping",
            Grouping::All => "all_grouping",
        }
    }
}

/// A validated inbound edge of a bolt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingSpec {
    pub grouping: Grouping,
    /// Source component name.
    pub component: String,
    /// Source stream; `None` means the default stream.
    pub stream: Option<String>,
}

impl GroupingSpec {
    pub fn stream_id(&self) -> &str {
        self.stream.as_deref().unwrap_or(DEFAULT_STREAM)
    }
}

/// Raw grouping entry as it appears in the document.
pub(crate) type RawGrouping = BTreeMap<String, RawGroupingTarget>;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawGroupingTarget {
    // Shorthand: `shuffle_grouping: source`
    Component(String),
    Detailed(RawGroupingDetail),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawGroupingDetail {
    #[serde(default)]
    pub component: Option<String>,

    #[serde(default)]
    pub stream: Option<String>,

    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Validate one raw grouping entry of `bolt` at position `index`.
pub(crate) fn validate_grouping(
    bolt: &str,
    index: usize,
    raw: RawGrouping,
) -> Result<GroupingSpec, ValidationError> {
    let malformed = |reason: &str| ValidationError::MalformedGrouping {
        bolt: bolt.to_string(),
        index,
        reason: reason.to_string(),
    };

    if raw.len() != 1 {
        return Err(malformed("expected exactly one grouping type per entry"));
    }
    let Some((kind, target)) = raw.into_iter().next() else {
        return Err(malformed("expected exactly one grouping type per entry"));
    };

    // The kind is checked first so an unknown kind is always named.
    let grouping = match kind.as_str() {
        "shuffle_grouping" => Grouping::Shuffle,
        "global_grouping" => Grouping::Global,
        "local_or_shuffle_grouping" => Grouping::LocalOrShuffle,
        "none_grouping" => Grouping::None,
        "all_grouping" => Grouping::All,
        "fields_grouping" => Grouping::Fields(Vec::new()),
        _ => {
            return Err(ValidationError::UnknownGrouping {
                bolt: bolt.to_string(),
                kind,
            });
        }
    };

    let detail = match target {
        RawGroupingTarget::Component(component) => RawGroupingDetail {
            component: Some(component),
            ..Default::default()
        },
        RawGroupingTarget::Detailed(detail) => detail,
    };

    let component = detail
        .component
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| malformed("missing 'component'"))?;

    if detail.stream.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(malformed("'stream' must not be empty"));
    }

    let grouping = match grouping {
        Grouping::Fields(_) => {
            let fields = detail
                .fields
                .ok_or_else(|| malformed("fields_grouping requires 'fields'"))?;
            if fields.is_empty() {
                return Err(malformed("fields_grouping requires at least one field"));
            }
            Grouping::Fields(fields)
        }
        other => {
            if detail.fields.is_some() {
                tracing::warn!(
                    "bolt '{}' grouping #{} ({}) ignores 'fields'",
                    bolt,
                    index,
                    other.key()
                );
            }
            other
        }
    };

    Ok(GroupingSpec {
        grouping,
        component,
        stream: detail.stream,
    })
}
