//! Demo provider: a native spout repeating one sentence at a fixed rate.
//!
//! Catalogued but not registered; enable it with e.g.
//! `--provider sentences=builtin:sentence`.

use crate::error::ResolutionError;
use crate::provider::{ProviderContext, SpoutOptions, SpoutProvider};
use crate::runtime::{NativeSpout, SpoutUnit};
use crate::spec::{OutputSchema, SpoutSpec};
use serde_json::Value;
use std::collections::BTreeMap;

pub const REFERENCE: &str = "builtin:sentence";

const DEFAULT_SENTENCE: &str = "No Sentence Specified";
const DEFAULT_SENTENCES_PER_MIN: i64 = 30;

const RATE: &str = "sentences_per_min";
/// Camel-case spelling used by existing topologies.
const RATE_ALIAS: &str = "sentencesPerMin";

pub struct SentenceSpoutProvider;

impl SpoutProvider for SentenceSpoutProvider {
    fn provide(
        &self,
        _ctx: &mut ProviderContext<'_>,
        spec: &SpoutSpec,
    ) -> Result<SpoutUnit, ResolutionError> {
        let opts = SpoutOptions::new("sentence", spec);

        // Non-string sentences fall back to the default.
        let sentence = spec
            .options
            .get("sentence")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SENTENCE);

        let per_min = match opts.optional_i64(RATE)? {
            Some(n) => Some(n),
            None => opts.optional_i64(RATE_ALIAS)?,
        };
        let per_min = per_min
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SENTENCES_PER_MIN);

        let mut config = BTreeMap::new();
        config.insert("sentence".to_string(), Value::from(sentence));
        config.insert(RATE.to_string(), Value::from(per_min));

        Ok(SpoutUnit::Native(NativeSpout {
            implementation: "sentence".to_string(),
            config,
            output_fields: OutputSchema::default_stream(["sentence"]),
        }))
    }
}
