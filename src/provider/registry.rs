//! Provider registry: spout kind -> provider.
//!
//! Lifecycle: the registry is written during startup (built-ins, then
//! builder-config plugins, then CLI overrides) and only read while a
//! topology compiles. Lookups clone the provider out of the lock, so a
//! provider may itself touch the registry without deadlocking.

use crate::config::ProviderOverride;
use crate::error::UsageError;
use crate::provider::{KafkaSpoutProvider, ProviderRef, SentenceSpoutProvider, kafka, sentence};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static GLOBAL: LazyLock<ProviderRegistry> = LazyLock::new(ProviderRegistry::with_builtins);

pub struct ProviderRegistry {
    /// Providers that overrides may reference, keyed by reference.
    catalog: RwLock<BTreeMap<String, ProviderRef>>,
    /// Active registrations, keyed by spout kind.
    providers: RwLock<BTreeMap<String, ProviderRef>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ProviderRegistry {
    /// Registry with no providers and an empty catalog.
    pub fn empty() -> Self {
        Self {
            catalog: RwLock::new(BTreeMap::new()),
            providers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry seeded with the built-in providers.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        let kafka = ProviderRef::new(kafka::REFERENCE, KafkaSpoutProvider);
        registry.install(kafka.clone());
        registry.install(ProviderRef::new(sentence::REFERENCE, SentenceSpoutProvider));
        registry.register(kafka::KIND, kafka);
        registry
    }

    /// Process-wide registry, seeded with built-ins on first use.
    pub fn global() -> &'static ProviderRegistry {
        &GLOBAL
    }

    /// Make a provider available to [`register_ref`](Self::register_ref).
    pub fn install(&self, provider: ProviderRef) {
        self.catalog
            .write()
            .insert(provider.reference().to_string(), provider);
    }

    /// Register `provider` for `kind`, replacing any earlier registration.
    ///
    /// Returns the replaced provider, if any.
    pub fn register(&self, kind: impl Into<String>, provider: ProviderRef) -> Option<ProviderRef> {
        let kind = kind.into();
        let previous = self.providers.write().insert(kind.clone(), provider.clone());
        match &previous {
            Some(prev) => tracing::info!(
                "provider '{}' = {} (replaces {})",
                kind,
                provider.reference(),
                prev.reference()
            ),
            None => tracing::debug!("provider '{}' = {}", kind, provider.reference()),
        }
        previous
    }

    /// Register the catalogued provider known as `reference` for `kind`.
    pub fn register_ref(&self, kind: &str, reference: &str) -> Result<(), UsageError> {
        let provider = self.catalog.read().get(reference).cloned().ok_or_else(|| {
            UsageError::UnknownReference {
                kind: kind.to_string(),
                reference: reference.to_string(),
            }
        })?;
        self.register(kind, provider);
        Ok(())
    }

    /// Apply overrides in order; later entries win.
    pub fn apply_overrides<'o>(
        &self,
        overrides: impl IntoIterator<Item = &'o ProviderOverride>,
    ) -> Result<(), UsageError> {
        for o in overrides {
            self.register_ref(&o.kind, &o.reference)?;
        }
        Ok(())
    }

    pub fn resolve(&self, kind: &str) -> Option<ProviderRef> {
        self.providers.read().get(kind).cloned()
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.providers.read().contains_key(kind)
    }

    /// (kind, reference) pairs, sorted by kind.
    pub fn registrations(&self) -> Vec<(String, String)> {
        self.providers
            .read()
            .iter()
            .map(|(kind, p)| (kind.clone(), p.reference().to_string()))
            .collect()
    }

    /// References available to overrides, sorted.
    pub fn catalog(&self) -> Vec<String> {
        self.catalog.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtins_register_kafka() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.is_registered("kafka"));
        assert!(!registry.is_registered("sentence"));
        assert_eq!(
            registry.resolve("kafka").unwrap().reference(),
            kafka::REFERENCE
        );
        assert_eq!(
            registry.catalog(),
            vec![kafka::REFERENCE.to_string(), sentence::REFERENCE.to_string()]
        );
    }

    #[test]
    fn unregistered_kind_is_not_found() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.resolve("spouts.words").is_none());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = ProviderRegistry::with_builtins();
        registry.register_ref("kafka", sentence::REFERENCE).unwrap();
        assert_eq!(
            registry.resolve("kafka").unwrap().reference(),
            sentence::REFERENCE
        );

        let replaced = registry.register(
            "kafka",
            ProviderRef::new(kafka::REFERENCE, KafkaSpoutProvider),
        );
        assert_eq!(replaced.unwrap().reference(), sentence::REFERENCE);
        assert_eq!(
            registry.registrations(),
            vec![("kafka".to_string(), kafka::REFERENCE.to_string())]
        );
    }

    #[test]
    fn overrides_apply_in_order() {
        let registry = ProviderRegistry::with_builtins();
        let overrides: Vec<ProviderOverride> = ["words=builtin:kafka", "words=builtin:sentence"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        registry.apply_overrides(&overrides).unwrap();
        assert_eq!(
            registry.resolve("words").unwrap().reference(),
            sentence::REFERENCE
        );
    }

    #[test]
    fn unknown_reference_is_a_usage_error() {
        let registry = ProviderRegistry::empty();
        let err = registry.register_ref("kafka", "builtin:kafka").unwrap_err();
        assert!(matches!(err, UsageError::UnknownReference { .. }));
        assert!(!registry.is_registered("kafka"));
    }

    #[test]
    fn global_registry_is_seeded() {
        assert!(ProviderRegistry::global().catalog().contains(&kafka::REFERENCE.to_string()));
    }
}
