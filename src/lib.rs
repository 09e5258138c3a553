//! Compile declarative stream topologies into runtime graphs.
//!
//! Pipeline: [`spec`] parses and validates a topology document,
//! [`provider`] maps spout kinds to resolvers, [`builder`] drives the
//! runtime's graph API, and [`runtime`] holds the graph, its tuning config
//! and submission.

pub mod builder;
pub mod config;
pub mod error;
pub mod provider;
pub mod runtime;
pub mod spec;

pub use builder::{CompiledTopology, build_topology, compile};
pub use error::{Error, Result};
pub use provider::{ProviderRegistry, SpoutProvider};
pub use spec::TopologySpec;
