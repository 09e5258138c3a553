//! Builder configuration: provider overrides from the command line and the
//! optional builder config file.
//!
//! Builder config (YAML):
//!   plugins:
//!     sentences: builtin:sentence
//!
//! Precedence, last write wins: built-ins, config `plugins`, CLI overrides.

use crate::error::UsageError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Legacy spelling of an override: `--provider.KIND=REF`.
const LEGACY_PROVIDER_PREFIX: &str = "--provider.";

/// One `KIND=REFERENCE` provider override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOverride {
    pub kind: String,
    pub reference: String,
}

impl FromStr for ProviderOverride {
    type Err = UsageError;

    /// Exactly one `=` with a non-empty kind and reference on either side.
    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let malformed = || UsageError::MalformedOverride {
            arg: arg.to_string(),
        };
        let parts: Vec<&str> = arg.split('=').collect();
        let [kind, reference] = parts.as_slice() else {
            return Err(malformed());
        };
        let (kind, reference) = (kind.trim(), reference.trim());
        if kind.is_empty() || reference.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            kind: kind.to_string(),
            reference: reference.to_string(),
        })
    }
}

/// Rewrite `--provider.KIND=REF` into `--provider KIND=REF`.
pub fn normalize_provider_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    for arg in args {
        match arg.strip_prefix(LEGACY_PROVIDER_PREFIX) {
            Some(rest) => {
                out.push("--provider".to_string());
                out.push(rest.to_string());
            }
            None => out.push(arg),
        }
    }
    out
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuilderConfig {
    /// kind -> provider reference
    #[serde(default)]
    pub plugins: BTreeMap<String, String>,
}

impl BuilderConfig {
    pub fn load(path: &Path) -> Result<Self, UsageError> {
        let content = std::fs::read_to_string(path).map_err(|source| UsageError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        // An empty file is a valid, empty config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self =
            serde_yaml::from_str(&content).map_err(|source| UsageError::ConfigParse {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!(
            "loaded builder config from {} ({} plugins)",
            path.display(),
            config.plugins.len()
        );
        Ok(config)
    }

    pub fn overrides(&self) -> Vec<ProviderOverride> {
        self.plugins
            .iter()
            .map(|(kind, reference)| ProviderOverride {
                kind: kind.clone(),
                reference: reference.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_kind_and_reference() {
        let o: ProviderOverride = "kafka=builtin:sentence".parse().unwrap();
        assert_eq!(
            o,
            ProviderOverride {
                kind: "kafka".to_string(),
                reference: "builtin:sentence".to_string(),
            }
        );
    }

    #[test]
    fn requires_exactly_one_separator() {
        for bad in ["kafka", "a=b=c", "=ref", "kind=", ""] {
            let err = bad.parse::<ProviderOverride>().unwrap_err();
            assert!(
                matches!(err, UsageError::MalformedOverride { ref arg } if arg == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn legacy_arguments_are_normalised() {
        let args = normalize_provider_args(
            ["bin", "--provider.kafka=builtin:sentence", "compile", "--local"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(
            args,
            vec![
                "bin",
                "--provider",
                "kafka=builtin:sentence",
                "compile",
                "--local"
            ]
        );
    }

    #[test]
    fn plugins_become_overrides() {
        let config: BuilderConfig =
            serde_yaml::from_str("plugins:\n  b: builtin:kafka\n  a: builtin:sentence").unwrap();
        let kinds: Vec<String> = config.overrides().into_iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec!["a", "b"]);
    }

    #[test]
    fn missing_file_is_a_usage_error() {
        let err = BuilderConfig::load(Path::new("/nonexistent/builder.yaml")).unwrap_err();
        assert!(matches!(err, UsageError::ConfigRead { .. }));
    }
}
