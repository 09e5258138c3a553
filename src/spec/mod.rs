//! Spec layer: document schema + validated in-memory topology.
//!
//! This module is pure data transformation; it never touches the provider
//! registry or the runtime graph. It owns:
//! - Topology document (name, tuning knobs, serializer)
//! - Component specs (bolts, spouts, output schemas)
//! - Grouping specs (inbound bolt edges)

pub mod component;
pub mod grouping;
pub mod topology;

pub use component::{BoltSpec, ComponentSpec, Options, OutputSchema, SpoutSpec};
pub use grouping::{DEFAULT_STREAM, Grouping, GroupingSpec};
pub use topology::{Serializer, TopologySpec};
