//! Runtime adapter: graph construction, tuning config, submission.

pub mod config;
pub mod graph;
pub mod submit;

pub use config::TopologyConfig;
pub use graph::{
    BoltVertex, GraphApi, NativeSpout, SpoutUnit, SpoutVertex, Topology, TopologyGraph, WorkerUnit,
};
pub use submit::{ManifestSubmitter, SubmitMode, Submission, Submitter};
