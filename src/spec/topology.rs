//! Topology document: the root of a spec.
//!
//! YAML shape:
//!   name: word_count
//!   workers: 2                   # optional tuning knobs; absent = runtime default
//!   ackers: 1
//!   max_spout_pending: 1000
//!   message_timeout_secs: 30
//!   max_shellbolt_pending: 100
//!   serializer: msgpack          # json (default) | msgpack
//!   logging_config: conf/logging.conf
//!   topology:
//!     - spout: {...}
//!     - bolt: {...}
//!
//! The raw shape is decoded with serde, then validated into a [`TopologySpec`].
//! Declaration order of components is preserved.

use crate::error::{Error, ParseError, ValidationError};
use crate::spec::component::{self, ComponentSpec, RawComponent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::path::Path;

/// Encoding used between the runtime and worker processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    /// Runtime default; nothing is overridden.
    #[default]
    Json,
    Msgpack,
}

impl Serializer {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "json" => Ok(Serializer::Json),
            "msgpack" => Ok(Serializer::Msgpack),
            other => Err(ValidationError::UnknownSerializer {
                value: other.to_string(),
            }),
        }
    }
}

/// Validated topology.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySpec {
    pub name: String,
    pub components: Vec<ComponentSpec>,
    pub workers: Option<NonZeroU32>,
    pub message_timeout_secs: Option<NonZeroU32>,
    pub max_spout_pending: Option<NonZeroU32>,
    /// Zero is meaningful: it disables acking.
    pub ackers: Option<u32>,
    pub max_shellbolt_pending: Option<NonZeroU32>,
    pub serializer: Serializer,
    pub logging_config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTopology {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    topology: Option<Vec<RawComponent>>,

    #[serde(default)]
    workers: Option<i64>,

    #[serde(default)]
    message_timeout_secs: Option<i64>,

    #[serde(default)]
    max_spout_pending: Option<i64>,

    #[serde(default)]
    ackers: Option<i64>,

    #[serde(default)]
    max_shellbolt_pending: Option<i64>,

    #[serde(default)]
    serializer: Option<String>,

    #[serde(default)]
    logging_config: Option<String>,
}

impl TopologySpec {
    /// Parse and validate a YAML (or JSON) topology document.
    pub fn from_yaml_str(text: &str) -> Result<Self, Error> {
        let raw: RawTopology = serde_yaml::from_str(text).map_err(ParseError::from)?;
        Ok(raw.validate_and_build()?)
    }

    /// Validate an already parsed document tree.
    pub fn from_document(doc: serde_yaml::Value) -> Result<Self, Error> {
        let raw: RawTopology = serde_yaml::from_value(doc).map_err(ParseError::from)?;
        Ok(raw.validate_and_build()?)
    }

    /// Read, parse and validate a topology file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let spec = Self::from_yaml_str(&text)?;
        tracing::info!(
            "loaded topology '{}' ({} components) from {}",
            spec.name,
            spec.components.len(),
            path.display()
        );
        Ok(spec)
    }
}

impl RawTopology {
    fn validate_and_build(self) -> Result<TopologySpec, ValidationError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ValidationError::MissingField {
                context: "topology".to_string(),
                field: "name".to_string(),
            })?;

        let serializer = match self.serializer.as_deref() {
            Some(s) => Serializer::parse(s)?,
            None => Serializer::default(),
        };

        let context = format!("topology '{}'", name);
        let workers = component::positive(&context, "workers", self.workers)?;
        let message_timeout_secs =
            component::positive(&context, "message_timeout_secs", self.message_timeout_secs)?;
        let max_spout_pending =
            component::positive(&context, "max_spout_pending", self.max_spout_pending)?;
        let max_shellbolt_pending =
            component::positive(&context, "max_shellbolt_pending", self.max_shellbolt_pending)?;
        let ackers = match self.ackers {
            None => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| ValidationError::InvalidValue {
                context: context.clone(),
                field: "ackers".to_string(),
                reason: format!("must be a non-negative integer, got {}", n),
            })?),
        };

        // Components: decode variants in order, then enforce unique names.
        let components = self
            .topology
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        for c in &components {
            if !seen.insert(c.name()) {
                return Err(ValidationError::DuplicateComponent {
                    name: c.name().to_string(),
                });
            }
        }

        Ok(TopologySpec {
            name,
            components,
            workers,
            message_timeout_secs,
            max_spout_pending,
            ackers,
            max_shellbolt_pending,
            serializer,
            logging_config: self.logging_config.filter(|l| !l.trim().is_empty()),
        })
    }
}
