//! Spout providers: pluggable resolvers from a spout spec to a runtime spout.
//!
//! A spout whose `type` is registered in the [`ProviderRegistry`] is handed
//! to that provider; any other spout runs as an out-of-process worker.

pub mod kafka;
pub mod registry;
pub mod sentence;

pub use kafka::KafkaSpoutProvider;
pub use registry::ProviderRegistry;
pub use sentence::SentenceSpoutProvider;

use crate::error::ResolutionError;
use crate::runtime::{SpoutUnit, TopologyConfig};
use crate::spec::SpoutSpec;
use std::fmt;
use std::sync::Arc;

/// Resolves a spout spec into a runtime spout.
///
/// Implementations validate their own options and fail with the name of
/// the first missing or invalid one; required options are never defaulted.
pub trait SpoutProvider: Send + Sync {
    fn provide(
        &self,
        ctx: &mut ProviderContext<'_>,
        spec: &SpoutSpec,
    ) -> Result<SpoutUnit, ResolutionError>;
}

/// What a provider may see and touch while resolving a spout.
pub struct ProviderContext<'a> {
    topology: &'a str,
    config: &'a mut TopologyConfig,
}

impl<'a> ProviderContext<'a> {
    pub fn new(topology: &'a str, config: &'a mut TopologyConfig) -> Self {
        Self { topology, config }
    }

    pub fn topology_name(&self) -> &str {
        self.topology
    }

    /// Runtime configuration of the topology being built.
    ///
    /// Providers that need runtime-wide settings write them here; the
    /// built-in providers never do.
    pub fn config_mut(&mut self) -> &mut TopologyConfig {
        self.config
    }
}

/// A provider together with the reference it is known by.
#[derive(Clone)]
pub struct ProviderRef {
    reference: String,
    provider: Arc<dyn SpoutProvider>,
}

impl ProviderRef {
    pub fn new(reference: impl Into<String>, provider: impl SpoutProvider + 'static) -> Self {
        Self {
            reference: reference.into(),
            provider: Arc::new(provider),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn provide(
        &self,
        ctx: &mut ProviderContext<'_>,
        spec: &SpoutSpec,
    ) -> Result<SpoutUnit, ResolutionError> {
        self.provider.provide(ctx, spec)
    }
}

impl fmt::Debug for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRef")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// Typed access to a spout's options, with errors naming the option.
pub struct SpoutOptions<'a> {
    provider: &'static str,
    spec: &'a SpoutSpec,
}

impl<'a> SpoutOptions<'a> {
    pub fn new(provider: &'static str, spec: &'a SpoutSpec) -> Self {
        Self { provider, spec }
    }

    fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.spec.options.get(key).filter(|v| !v.is_null())
    }

    fn missing(&self, key: &str) -> ResolutionError {
        ResolutionError::MissingOption {
            provider: self.provider.to_string(),
            spout: self.spec.name.clone(),
            option: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, expected: &str) -> ResolutionError {
        ResolutionError::InvalidOption {
            provider: self.provider.to_string(),
            spout: self.spec.name.clone(),
            option: key.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str, ResolutionError> {
        self.optional_str(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ResolutionError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a string")),
        }
    }

    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, ResolutionError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a boolean")),
        }
    }

    /// Integer option; numeric strings are accepted.
    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, ResolutionError> {
        match self.get(key) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.invalid(key, "an integer")),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an integer")),
        }
    }
}
