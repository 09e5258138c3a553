//! Built-in Kafka spout provider.
//!
//! Options:
//! - `topic` (required)
//! - `zk_hosts` (required)
//! - `zk_root`: offsets root, defaults to `/kafka-offsets/<topology>`
//! - `consumer_id`: defaults to `<topology>-<spout>`
//! - `from_start`: bool
//! - `start_offset_time`: integer

use crate::error::ResolutionError;
use crate::provider::{ProviderContext, SpoutOptions, SpoutProvider};
use crate::runtime::{NativeSpout, SpoutUnit};
use crate::spec::{OutputSchema, SpoutSpec};
use serde_json::Value;
use std::collections::BTreeMap;

/// Spout kind the provider is registered for at startup.
pub const KIND: &str = "kafka";
/// Catalogue reference of this provider.
pub const REFERENCE: &str = "builtin:kafka";

const ZK_ROOT_PREFIX: &str = "/kafka-offsets";
/// Messages are decoded as UTF-8 key/value strings into a single field.
const SCHEME: &str = "string_key_value";
const OUTPUT_FIELD: &str = "str";

pub struct KafkaSpoutProvider;

impl SpoutProvider for KafkaSpoutProvider {
    fn provide(
        &self,
        ctx: &mut ProviderContext<'_>,
        spec: &SpoutSpec,
    ) -> Result<SpoutUnit, ResolutionError> {
        let opts = SpoutOptions::new(KIND, spec);

        let topic = opts.required_str("topic")?;
        let zk_hosts = opts.required_str("zk_hosts")?;

        let zk_root = match opts.optional_str("zk_root")? {
            Some(root) => root.to_string(),
            None => format!("{}/{}", ZK_ROOT_PREFIX, ctx.topology_name()),
        };
        let consumer_id = match opts.optional_str("consumer_id")? {
            Some(id) => id.to_string(),
            None => format!("{}-{}", ctx.topology_name(), spec.name),
        };

        let mut config = BTreeMap::new();
        config.insert("topic".to_string(), Value::from(topic));
        config.insert("zk_hosts".to_string(), Value::from(zk_hosts));
        config.insert("zk_root".to_string(), Value::from(zk_root));
        config.insert("consumer_id".to_string(), Value::from(consumer_id));
        config.insert("scheme".to_string(), Value::from(SCHEME));

        if let Some(from_start) = opts.optional_bool("from_start")? {
            config.insert("force_from_start".to_string(), Value::from(from_start));
        }
        if let Some(offset_time) = opts.optional_i64("start_offset_time")? {
            config.insert("start_offset_time".to_string(), Value::from(offset_time));
        }

        Ok(SpoutUnit::Native(NativeSpout {
            implementation: KIND.to_string(),
            config,
            output_fields: OutputSchema::default_stream([OUTPUT_FIELD]),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TopologyConfig;
    use crate::spec::Options;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn spout(options: Value) -> SpoutSpec {
        let options: Options = serde_json::from_value(options).unwrap();
        SpoutSpec {
            name: "events".to_string(),
            kind: Some(KIND.to_string()),
            module: None,
            options,
            output_fields: None,
            tick_freq_secs: None,
            parallelism_hint: None,
            tasks: None,
        }
    }

    fn provide(options: Value) -> Result<SpoutUnit, ResolutionError> {
        let mut config = TopologyConfig::new();
        let mut ctx = ProviderContext::new("clicks", &mut config);
        let unit = KafkaSpoutProvider.provide(&mut ctx, &spout(options));
        assert!(config.is_empty(), "kafka provider must not touch config");
        unit
    }

    fn native(unit: SpoutUnit) -> NativeSpout {
        match unit {
            SpoutUnit::Native(n) => n,
            other => panic!("expected native spout, got {:?}", other),
        }
    }

    #[test]
    fn topic_is_required_even_with_zk_hosts() {
        let err = provide(json!({"zk_hosts": "zk:2181"})).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::MissingOption {
                provider: "kafka".to_string(),
                spout: "events".to_string(),
                option: "topic".to_string(),
            }
        );
    }

    #[test]
    fn zk_hosts_is_required() {
        let err = provide(json!({"topic": "t"})).unwrap_err();
        assert!(err.to_string().contains("'zk_hosts'"));
    }

    #[test]
    fn derived_identifiers_default_from_names() {
        let spout = native(provide(json!({"topic": "t", "zk_hosts": "zk:2181"})).unwrap());
        assert_eq!(spout.implementation, "kafka");
        assert_eq!(spout.config["zk_root"], json!("/kafka-offsets/clicks"));
        assert_eq!(spout.config["consumer_id"], json!("clicks-events"));
        assert_eq!(spout.config.get("force_from_start"), None);
        assert_eq!(spout.output_fields, OutputSchema::default_stream(["str"]));
    }

    #[test]
    fn optional_settings_are_passed_through() {
        let spout = native(
            provide(json!({
                "topic": "t",
                "zk_hosts": "zk:2181",
                "zk_root": "/custom",
                "consumer_id": "me",
                "from_start": true,
                "start_offset_time": -2
            }))
            .unwrap(),
        );
        assert_eq!(spout.config["zk_root"], json!("/custom"));
        assert_eq!(spout.config["consumer_id"], json!("me"));
        assert_eq!(spout.config["force_from_start"], json!(true));
        assert_eq!(spout.config["start_offset_time"], json!(-2));
    }

    #[test]
    fn mistyped_option_fails_fast() {
        let err = provide(json!({"topic": "t", "zk_hosts": "zk", "from_start": 1})).unwrap_err();
        assert!(
            matches!(err, ResolutionError::InvalidOption { ref option, .. } if option == "from_start")
        );
    }
}
