//! Component specs: the spouts and bolts of a topology.
//!
//! Each entry of the document's `topology` sequence is a single-key mapping:
//!   - spout:
//!       name: sentences
//!       type: kafka                 # optional, selects a provider
//!       module: spouts.sentences    # worker module, used when no provider matches
//!       options: {topic: lines}
//!       output_fields: [sentence]   # or {stream: [fields], ...}
//!       tick_freq_secs: 1.5
//!       parallelism_hint: 2
//!       tasks: 4
//!   - bolt:
//!       name: count
//!       module: bolts.count
//!       groupings: [...]

use crate::error::ValidationError;
use crate::spec::grouping::{self, DEFAULT_STREAM, GroupingSpec, RawGrouping};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

/// Free-form options handed opaquely to the resolved implementation.
pub type Options = BTreeMap<String, serde_json::Value>;

/// Declared output fields, keyed by stream id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutputSchema {
    streams: BTreeMap<String, Vec<String>>,
}

impl OutputSchema {
    /// Schema with a single default stream.
    pub fn default_stream<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut streams = BTreeMap::new();
        streams.insert(
            DEFAULT_STREAM.to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
        Self { streams }
    }

    pub fn stream(&self, id: &str) -> Option<&[String]> {
        self.streams.get(id).map(Vec::as_slice)
    }

    /// True if no stream declares any field.
    pub fn is_empty(&self) -> bool {
        self.streams.values().all(Vec::is_empty)
    }
}

/// A worker-implemented processing component.
#[derive(Debug, Clone, PartialEq)]
pub struct BoltSpec {
    pub name: String,
    pub module: String,
    pub options: Options,
    pub output_fields: Option<OutputSchema>,
    pub tick_freq_secs: Option<f64>,
    pub parallelism_hint: Option<NonZeroU32>,
    pub tasks: Option<NonZeroU32>,
    pub groupings: Vec<GroupingSpec>,
}

/// A source component, resolved through a provider or as a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpoutSpec {
    pub name: String,
    /// Provider kind (`type` in the document).
    pub kind: Option<String>,
    pub module: Option<String>,
    pub options: Options,
    pub output_fields: Option<OutputSchema>,
    pub tick_freq_secs: Option<f64>,
    pub parallelism_hint: Option<NonZeroU32>,
    pub tasks: Option<NonZeroU32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSpec {
    Bolt(BoltSpec),
    Spout(SpoutSpec),
}

impl ComponentSpec {
    pub fn name(&self) -> &str {
        match self {
            ComponentSpec::Bolt(b) => &b.name,
            ComponentSpec::Spout(s) => &s.name,
        }
    }
}

/// Raw component entry: exactly one of `bolt` / `spout` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawComponent {
    #[serde(default)]
    pub bolt: Option<RawBolt>,

    #[serde(default)]
    pub spout: Option<RawSpout>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBolt {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub output_fields: Option<RawOutputFields>,

    #[serde(default)]
    pub tick_freq_secs: Option<f64>,

    #[serde(default)]
    pub parallelism_hint: Option<i64>,

    #[serde(default)]
    pub tasks: Option<i64>,

    #[serde(default)]
    pub groupings: Option<Vec<RawGrouping>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSpout {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub output_fields: Option<RawOutputFields>,

    #[serde(default)]
    pub tick_freq_secs: Option<f64>,

    #[serde(default)]
    pub parallelism_hint: Option<i64>,

    #[serde(default)]
    pub tasks: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawOutputFields {
    // Default stream only: output_fields: [a, b]
    Default(Vec<String>),
    // Named streams: output_fields: {default: [a], errors: [e]}
    Streams(BTreeMap<String, Vec<String>>),
}

impl RawComponent {
    /// Decode the discriminant and validate the populated variant.
    pub(crate) fn validate(self, index: usize) -> Result<ComponentSpec, ValidationError> {
        match (self.bolt, self.spout) {
            (Some(bolt), None) => bolt.validate(index).map(ComponentSpec::Bolt),
            (None, Some(spout)) => spout.validate(index).map(ComponentSpec::Spout),
            (Some(_), Some(_)) => Err(ValidationError::AmbiguousComponent { index }),
            (None, None) => Err(ValidationError::UnknownComponent { index }),
        }
    }
}

impl RawBolt {
    fn validate(self, index: usize) -> Result<BoltSpec, ValidationError> {
        let name = required_name(self.name, "bolt", index)?;
        let context = format!("bolt '{}'", name);

        let module = self
            .module
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ValidationError::MissingField {
                context: context.clone(),
                field: "module".to_string(),
            })?;

        let groupings = self
            .groupings
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, raw)| grouping::validate_grouping(&name, i, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BoltSpec {
            output_fields: output_schema(&context, self.output_fields)?,
            tick_freq_secs: tick_interval(&context, self.tick_freq_secs)?,
            parallelism_hint: positive(&context, "parallelism_hint", self.parallelism_hint)?,
            tasks: positive(&context, "tasks", self.tasks)?,
            options: self.options.unwrap_or_default(),
            name,
            module,
            groupings,
        })
    }
}

impl RawSpout {
    fn validate(self, index: usize) -> Result<SpoutSpec, ValidationError> {
        let name = required_name(self.name, "spout", index)?;
        let context = format!("spout '{}'", name);

        Ok(SpoutSpec {
            kind: self.kind.filter(|k| !k.trim().is_empty()),
            module: self.module.filter(|m| !m.trim().is_empty()),
            output_fields: output_schema(&context, self.output_fields)?,
            tick_freq_secs: tick_interval(&context, self.tick_freq_secs)?,
            parallelism_hint: positive(&context, "parallelism_hint", self.parallelism_hint)?,
            tasks: positive(&context, "tasks", self.tasks)?,
            options: self.options.unwrap_or_default(),
            name,
        })
    }
}

fn required_name(
    name: Option<String>,
    variant: &str,
    index: usize,
) -> Result<String, ValidationError> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ValidationError::MissingField {
            context: format!("{} at topology entry #{}", variant, index),
            field: "name".to_string(),
        })
}

fn output_schema(
    context: &str,
    raw: Option<RawOutputFields>,
) -> Result<Option<OutputSchema>, ValidationError> {
    let streams = match raw {
        None => return Ok(None),
        Some(RawOutputFields::Default(fields)) => {
            BTreeMap::from([(DEFAULT_STREAM.to_string(), fields)])
        }
        Some(RawOutputFields::Streams(streams)) => streams,
    };

    for (stream, fields) in &streams {
        if stream.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                context: context.to_string(),
                field: "output_fields".to_string(),
                reason: "stream ids must not be empty".to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for field in fields {
            if !seen.insert(field.as_str()) {
                return Err(ValidationError::DuplicateOutputField {
                    context: context.to_string(),
                    stream: stream.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    Ok(Some(OutputSchema { streams }))
}

fn tick_interval(context: &str, secs: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match secs {
        Some(s) if !s.is_finite() || s <= 0.0 => Err(ValidationError::InvalidValue {
            context: context.to_string(),
            field: "tick_freq_secs".to_string(),
            reason: format!("must be a positive number of seconds, got {}", s),
        }),
        other => Ok(other),
    }
}

/// Validate an optional strictly positive count.
pub(crate) fn positive(
    context: &str,
    field: &str,
    value: Option<i64>,
) -> Result<Option<NonZeroU32>, ValidationError> {
    let Some(v) = value else {
        return Ok(None);
    };
    u32::try_from(v)
        .ok()
        .and_then(NonZeroU32::new)
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidValue {
            context: context.to_string(),
            field: field.to_string(),
            reason: format!("must be a positive integer, got {}", v),
        })
}
