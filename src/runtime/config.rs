//! Runtime configuration: tuning knobs written as runtime config keys.
//!
//! Only knobs set in the topology are written; anything absent is left to
//! the runtime's own defaults.

use crate::runtime::submit::SubmitMode;
use crate::spec::{Serializer, TopologySpec};
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOPOLOGY_WORKERS: &str = "topology.workers";
pub const TOPOLOGY_ACKER_EXECUTORS: &str = "topology.acker.executors";
pub const TOPOLOGY_MAX_SPOUT_PENDING: &str = "topology.max.spout.pending";
pub const TOPOLOGY_MESSAGE_TIMEOUT_SECS: &str = "topology.message.timeout.secs";
pub const TOPOLOGY_SHELLBOLT_MAX_PENDING: &str = "topology.shellbolt.max.pending";
pub const TOPOLOGY_MULTILANG_SERIALIZER: &str = "topology.multilang.serializer";
pub const TOPOLOGY_DEBUG: &str = "topology.debug";
pub const TOPOLOGY_MAX_TASK_PARALLELISM: &str = "topology.max.task.parallelism";

/// Worker-protocol serializer loaded by the runtime for msgpack topologies.
pub const MSGPACK_SERIALIZER_IMPL: &str = "com.yelp.pyleus.serializer.MessagePackSerializer";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TopologyConfig {
    entries: BTreeMap<String, serde_json::Value>,
}

impl TopologyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate the topology's tuning knobs, one optional field at a time.
    pub fn from_spec(spec: &TopologySpec) -> Self {
        let mut conf = Self::new();
        conf.set_serializer(spec.serializer);

        if let Some(n) = spec.max_shellbolt_pending {
            conf.put(TOPOLOGY_SHELLBOLT_MAX_PENDING, n.get());
        }
        if let Some(n) = spec.workers {
            conf.put(TOPOLOGY_WORKERS, n.get());
        }
        if let Some(n) = spec.max_spout_pending {
            conf.put(TOPOLOGY_MAX_SPOUT_PENDING, n.get());
        }
        if let Some(n) = spec.message_timeout_secs {
            conf.put(TOPOLOGY_MESSAGE_TIMEOUT_SECS, n.get());
        }
        if let Some(n) = spec.ackers {
            conf.put(TOPOLOGY_ACKER_EXECUTORS, n);
        }
        conf
    }

    pub fn set_serializer(&mut self, serializer: Serializer) {
        match serializer {
            // json is the runtime default
            Serializer::Json => {
                self.entries.remove(TOPOLOGY_MULTILANG_SERIALIZER);
            }
            Serializer::Msgpack => self.put(TOPOLOGY_MULTILANG_SERIALIZER, MSGPACK_SERIALIZER_IMPL),
        }
    }

    /// Settings that depend on how the topology is submitted.
    pub fn apply_mode(&mut self, mode: SubmitMode) {
        match mode {
            SubmitMode::Local { debug } => {
                self.put(TOPOLOGY_DEBUG, debug);
                self.put(TOPOLOGY_MAX_TASK_PARALLELISM, 1);
            }
            SubmitMode::Cluster => self.put(TOPOLOGY_DEBUG, false),
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
