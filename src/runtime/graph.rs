//! Runtime graph API and the in-memory graph handed to the runtime.
//!
//! [`GraphApi`] is the boundary the compiler drives: register spouts and
//! bolts, override task counts, add grouping edges, then `build`.
//! [`TopologyGraph`] implements it by recording a serialisable [`Topology`].

use crate::error::ValidationError;
use crate::spec::{Grouping, GroupingSpec, Options, OutputSchema, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Descriptor of a processing unit run by an out-of-process worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerUnit {
    pub module: String,
    pub options: Options,
    pub logging_config: Option<String>,
    pub serializer: Serializer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<OutputSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_freq_secs: Option<f64>,
}

impl WorkerUnit {
    pub fn new(
        module: impl Into<String>,
        options: Options,
        logging_config: Option<String>,
        serializer: Serializer,
    ) -> Self {
        Self {
            module: module.into(),
            options,
            logging_config,
            serializer,
            output_fields: None,
            tick_freq_secs: None,
        }
    }

    pub fn set_output_fields(&mut self, fields: OutputSchema) {
        self.output_fields = Some(fields);
    }

    pub fn set_tick_freq_secs(&mut self, secs: f64) {
        self.tick_freq_secs = Some(secs);
    }

    /// Worker schemas are fully known: undeclared means emits nothing.
    fn schema(&self) -> OutputSchema {
        self.output_fields.clone().unwrap_or_default()
    }
}

/// A spout implemented natively by the runtime, configured by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeSpout {
    pub implementation: String,
    pub config: BTreeMap<String, serde_json::Value>,
    pub output_fields: OutputSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpoutUnit {
    Worker(WorkerUnit),
    Native(NativeSpout),
}

impl SpoutUnit {
    /// Streams and fields this spout emits.
    pub(crate) fn schema(&self) -> OutputSchema {
        match self {
            SpoutUnit::Worker(w) => w.schema(),
            SpoutUnit::Native(n) => n.output_fields.clone(),
        }
    }
}

/// Graph-construction operations exposed by the runtime.
pub trait GraphApi {
    type Output;

    fn set_spout(
        &mut self,
        name: &str,
        spout: SpoutUnit,
        parallelism: Option<NonZeroU32>,
    ) -> Result<(), ValidationError>;

    fn set_bolt(
        &mut self,
        name: &str,
        bolt: WorkerUnit,
        parallelism: Option<NonZeroU32>,
    ) -> Result<(), ValidationError>;

    /// Override the task count of a registered component.
    fn set_num_tasks(&mut self, name: &str, tasks: NonZeroU32) -> Result<(), ValidationError>;

    /// Subscribe `bolt` to `edge.component`.
    fn add_grouping(&mut self, bolt: &str, edge: GroupingSpec) -> Result<(), ValidationError>;

    fn build(self) -> Result<Self::Output, ValidationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpoutVertex {
    pub name: String,
    pub unit: SpoutUnit,
    pub parallelism: Option<NonZeroU32>,
    pub tasks: Option<NonZeroU32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoltVertex {
    pub name: String,
    pub unit: WorkerUnit,
    pub parallelism: Option<NonZeroU32>,
    pub tasks: Option<NonZeroU32>,
    pub inputs: Vec<GroupingSpec>,
}

/// Submittable graph: vertices in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    pub spouts: Vec<SpoutVertex>,
    pub bolts: Vec<BoltVertex>,
}

impl Topology {
    pub fn spout(&self, name: &str) -> Option<&SpoutVertex> {
        self.spouts.iter().find(|s| s.name == name)
    }

    pub fn bolt(&self, name: &str) -> Option<&BoltVertex> {
        self.bolts.iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, Copy)]
enum Vertex {
    Spout(usize),
    Bolt(usize),
}

/// In-memory [`GraphApi`] implementation.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    topology: Topology,
    index: BTreeMap<String, Vertex>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, name: &str, vertex: Vertex) -> Result<(), ValidationError> {
        if self.index.contains_key(name) {
            return Err(ValidationError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        self.index.insert(name.to_string(), vertex);
        Ok(())
    }

    fn schema_of(&self, name: &str) -> Option<OutputSchema> {
        match self.index.get(name)? {
            Vertex::Spout(i) => Some(self.topology.spouts[*i].unit.schema()),
            Vertex::Bolt(i) => Some(self.topology.bolts[*i].unit.schema()),
        }
    }
}

impl GraphApi for TopologyGraph {
    type Output = Topology;

    fn set_spout(
        &mut self,
        name: &str,
        spout: SpoutUnit,
        parallelism: Option<NonZeroU32>,
    ) -> Result<(), ValidationError> {
        self.claim(name, Vertex::Spout(self.topology.spouts.len()))?;
        self.topology.spouts.push(SpoutVertex {
            name: name.to_string(),
            unit: spout,
            parallelism,
            tasks: None,
        });
        tracing::debug!("registered spout '{}' (parallelism {:?})", name, parallelism);
        Ok(())
    }

    fn set_bolt(
        &mut self,
        name: &str,
        bolt: WorkerUnit,
        parallelism: Option<NonZeroU32>,
    ) -> Result<(), ValidationError> {
        self.claim(name, Vertex::Bolt(self.topology.bolts.len()))?;
        self.topology.bolts.push(BoltVertex {
            name: name.to_string(),
            unit: bolt,
            parallelism,
            tasks: None,
            inputs: Vec::new(),
        });
        tracing::debug!("registered bolt '{}' (parallelism {:?})", name, parallelism);
        Ok(())
    }

    fn set_num_tasks(&mut self, name: &str, tasks: NonZeroU32) -> Result<(), ValidationError> {
        match self.index.get(name) {
            Some(Vertex::Spout(i)) => self.topology.spouts[*i].tasks = Some(tasks),
            Some(Vertex::Bolt(i)) => self.topology.bolts[*i].tasks = Some(tasks),
            None => {
                return Err(ValidationError::UnregisteredComponent {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn add_grouping(&mut self, bolt: &str, edge: GroupingSpec) -> Result<(), ValidationError> {
        let Some(Vertex::Bolt(i)) = self.index.get(bolt) else {
            return Err(ValidationError::UnregisteredComponent {
                name: bolt.to_string(),
            });
        };
        tracing::debug!(
            "{} {} -> {} on stream '{}'",
            edge.grouping.key(),
            edge.component,
            bolt,
            edge.stream_id()
        );
        self.topology.bolts[*i].inputs.push(edge);
        Ok(())
    }

    /// Re-check every edge against the resolved source schemas.
    fn build(self) -> Result<Topology, ValidationError> {
        for bolt in &self.topology.bolts {
            for edge in &bolt.inputs {
                let schema = self.schema_of(&edge.component).ok_or_else(|| {
                    ValidationError::DanglingReference {
                        bolt: bolt.name.clone(),
                        component: edge.component.clone(),
                    }
                })?;
                check_subscription(&bolt.name, edge, &schema)?;
            }
        }
        Ok(self.topology)
    }
}

/// Check that `edge` only uses a stream and fields its source declares.
pub(crate) fn check_subscription(
    bolt: &str,
    edge: &GroupingSpec,
    schema: &OutputSchema,
) -> Result<(), ValidationError> {
    let stream = edge.stream_id();
    let declared = schema
        .stream(stream)
        .ok_or_else(|| ValidationError::UnknownStream {
            bolt: bolt.to_string(),
            component: edge.component.clone(),
            stream: stream.to_string(),
        })?;

    if let Grouping::Fields(fields) = &edge.grouping {
        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !declared.contains(f))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::UndeclaredFields {
                bolt: bolt.to_string(),
                component: edge.component.clone(),
                stream: stream.to_string(),
                fields: missing,
            });
        }
    }

    Ok(())
}
