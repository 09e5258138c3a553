//! Graph builder: compiles a validated topology spec into a runtime graph.
//!
//! Compilation runs in three phases:
//! 1) Route every component (provider or worker), resolve provided spouts
//!    and validate the wiring. Nothing touches the graph until this phase
//!    passes.
//! 2) Register components in declaration order; bolts also wire their
//!    groupings, in the order declared.
//! 3) Build the graph.
//!
//! Given the same spec and registry state, the sequence of graph calls is
//! identical. Any error aborts compilation; no partial graph is returned.

use crate::error::{Error, SubmitError, ValidationError};
use crate::provider::{ProviderContext, ProviderRef, ProviderRegistry};
use crate::runtime::graph::check_subscription;
use crate::runtime::{
    GraphApi, SpoutUnit, SubmitMode, Submission, Submitter, Topology, TopologyConfig,
    TopologyGraph, WorkerUnit,
};
use crate::spec::{BoltSpec, ComponentSpec, OutputSchema, SpoutSpec, TopologySpec};
use std::collections::BTreeMap;

/// A compiled topology, ready for submission.
#[derive(Debug, Clone)]
pub struct CompiledTopology {
    pub name: String,
    pub topology: Topology,
    pub config: TopologyConfig,
}

impl CompiledTopology {
    /// Apply mode-specific settings and hand the topology to `submitter`.
    pub fn submit<S: Submitter>(
        mut self,
        mode: SubmitMode,
        submitter: &mut S,
    ) -> Result<(), SubmitError> {
        self.config.apply_mode(mode);
        submitter.submit(&Submission {
            name: &self.name,
            mode,
            config: &self.config,
            topology: &self.topology,
        })
    }
}

/// Compile `spec` into an in-memory [`Topology`] plus its runtime config.
pub fn compile(
    spec: &TopologySpec,
    registry: &ProviderRegistry,
) -> Result<CompiledTopology, Error> {
    let mut config = TopologyConfig::from_spec(spec);
    let topology = build_topology(spec, registry, &mut config, TopologyGraph::new())?;
    Ok(CompiledTopology {
        name: spec.name.clone(),
        topology,
        config,
    })
}

/// How a component is turned into a runtime unit.
enum Route {
    Worker,
    Provided(SpoutUnit),
}

/// Compile `spec` against any [`GraphApi`] implementation.
///
/// Providers may write runtime-wide settings into `config`.
pub fn build_topology<G: GraphApi>(
    spec: &TopologySpec,
    registry: &ProviderRegistry,
    config: &mut TopologyConfig,
    mut graph: G,
) -> Result<G::Output, Error> {
    tracing::info!(
        "compiling topology '{}' ({} components)",
        spec.name,
        spec.components.len()
    );

    // Phase 1: provided spouts are resolved here, once each, so every edge
    // is checked against a known schema before the graph is touched.
    let routes = route_components(spec, registry, config)?;

    // Phase 2: register in declaration order.
    for (component, route) in spec.components.iter().zip(routes) {
        match (component, route) {
            (ComponentSpec::Bolt(bolt), _) => handle_bolt(&mut graph, bolt, spec)?,
            (ComponentSpec::Spout(spout), route) => {
                let unit = match route {
                    Route::Provided(unit) => unit,
                    Route::Worker => SpoutUnit::Worker(worker_spout(spout, spec)),
                };
                graph.set_spout(&spout.name, unit, spout.parallelism_hint)?;
                if let Some(tasks) = spout.tasks {
                    graph.set_num_tasks(&spout.name, tasks)?;
                }
            }
        }
    }

    // Phase 3: build.
    let output = graph.build()?;
    tracing::info!("compiled topology '{}'", spec.name);
    Ok(output)
}

/// Classify each component, resolve provided spouts and check every
/// grouping edge.
fn route_components(
    spec: &TopologySpec,
    registry: &ProviderRegistry,
    config: &mut TopologyConfig,
) -> Result<Vec<Route>, Error> {
    let mut routes = Vec::with_capacity(spec.components.len());
    let mut schemas: BTreeMap<&str, OutputSchema> = BTreeMap::new();

    for component in &spec.components {
        let (route, schema) = match component {
            ComponentSpec::Bolt(bolt) => {
                (Route::Worker, bolt.output_fields.clone().unwrap_or_default())
            }
            ComponentSpec::Spout(spout) => {
                match spout.kind.as_deref().and_then(|k| registry.resolve(k)) {
                    Some(provider) => {
                        let unit = provide_spout(spec, spout, &provider, config)?;
                        let schema = unit.schema();
                        (Route::Provided(unit), schema)
                    }
                    None => {
                        check_worker_spout(spout)?;
                        (Route::Worker, spout.output_fields.clone().unwrap_or_default())
                    }
                }
            }
        };
        routes.push(route);
        schemas.insert(component.name(), schema);
    }

    for component in &spec.components {
        let ComponentSpec::Bolt(bolt) = component else {
            continue;
        };
        for edge in &bolt.groupings {
            let schema = schemas.get(edge.component.as_str()).ok_or_else(|| {
                ValidationError::DanglingReference {
                    bolt: bolt.name.clone(),
                    component: edge.component.clone(),
                }
            })?;
            check_subscription(&bolt.name, edge, schema)?;
        }
    }

    Ok(routes)
}

fn provide_spout(
    spec: &TopologySpec,
    spout: &SpoutSpec,
    provider: &ProviderRef,
    config: &mut TopologyConfig,
) -> Result<SpoutUnit, Error> {
    if spout.output_fields.is_some() {
        tracing::warn!(
            "spout '{}' is provided by {}; its output_fields are ignored",
            spout.name,
            provider.reference()
        );
    }
    if spout.tick_freq_secs.is_some() {
        tracing::warn!(
            "spout '{}' is provided by {}; its tick_freq_secs is ignored",
            spout.name,
            provider.reference()
        );
    }
    tracing::debug!(
        "spout '{}' resolved by provider {}",
        spout.name,
        provider.reference()
    );
    let mut ctx = ProviderContext::new(&spec.name, config);
    Ok(provider.provide(&mut ctx, spout)?)
}

/// A worker spout needs a module and something to emit.
fn check_worker_spout(spout: &SpoutSpec) -> Result<(), ValidationError> {
    if spout.output_fields.as_ref().is_none_or(OutputSchema::is_empty) {
        return Err(ValidationError::SpoutWithoutOutputFields {
            spout: spout.name.clone(),
        });
    }
    if spout.module.is_none() {
        return Err(ValidationError::MissingField {
            context: format!("spout '{}'", spout.name),
            field: "module".to_string(),
        });
    }
    Ok(())
}

fn worker_spout(spout: &SpoutSpec, topology: &TopologySpec) -> WorkerUnit {
    let mut unit = WorkerUnit::new(
        spout.module.clone().unwrap_or_default(),
        spout.options.clone(),
        topology.logging_config.clone(),
        topology.serializer,
    );
    if let Some(fields) = &spout.output_fields {
        unit.set_output_fields(fields.clone());
    }
    if let Some(secs) = spout.tick_freq_secs {
        unit.set_tick_freq_secs(secs);
    }
    unit
}

fn handle_bolt<G: GraphApi>(
    graph: &mut G,
    bolt: &BoltSpec,
    topology: &TopologySpec,
) -> Result<(), ValidationError> {
    let mut unit = WorkerUnit::new(
        bolt.module.clone(),
        bolt.options.clone(),
        topology.logging_config.clone(),
        topology.serializer,
    );
    if let Some(fields) = &bolt.output_fields {
        unit.set_output_fields(fields.clone());
    }
    if let Some(secs) = bolt.tick_freq_secs {
        unit.set_tick_freq_secs(secs);
    }

    graph.set_bolt(&bolt.name, unit, bolt.parallelism_hint)?;
    if let Some(tasks) = bolt.tasks {
        graph.set_num_tasks(&bolt.name, tasks)?;
    }

    for edge in &bolt.groupings {
        graph.add_grouping(&bolt.name, edge.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::provider::{SpoutProvider, kafka};
    use crate::runtime::NativeSpout;
    use crate::spec::{Grouping, GroupingSpec};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::num::NonZeroU32;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum GraphCall {
        SetSpout {
            name: String,
            unit: SpoutUnit,
            parallelism: Option<u32>,
        },
        SetBolt {
            name: String,
            module: String,
            parallelism: Option<u32>,
        },
        SetNumTasks {
            name: String,
            tasks: u32,
        },
        AddGrouping {
            bolt: String,
            edge: GroupingSpec,
        },
        Build,
    }

    /// Records every graph call, visible even when compilation fails.
    #[derive(Default, Clone)]
    struct RecordingGraph {
        calls: Rc<RefCell<Vec<GraphCall>>>,
    }

    impl RecordingGraph {
        fn calls(&self) -> Vec<GraphCall> {
            self.calls.borrow().clone()
        }
    }

    impl GraphApi for RecordingGraph {
        type Output = Vec<GraphCall>;

        fn set_spout(
            &mut self,
            name: &str,
            spout: SpoutUnit,
            parallelism: Option<NonZeroU32>,
        ) -> Result<(), ValidationError> {
            self.calls.borrow_mut().push(GraphCall::SetSpout {
                name: name.to_string(),
                unit: spout,
                parallelism: parallelism.map(NonZeroU32::get),
            });
            Ok(())
        }

        fn set_bolt(
            &mut self,
            name: &str,
            bolt: WorkerUnit,
            parallelism: Option<NonZeroU32>,
        ) -> Result<(), ValidationError> {
            self.calls.borrow_mut().push(GraphCall::SetBolt {
                name: name.to_string(),
                module: bolt.module,
                parallelism: parallelism.map(NonZeroU32::get),
            });
            Ok(())
        }

        fn set_num_tasks(&mut self, name: &str, tasks: NonZeroU32) -> Result<(), ValidationError> {
            self.calls.borrow_mut().push(GraphCall::SetNumTasks {
                name: name.to_string(),
                tasks: tasks.get(),
            });
            Ok(())
        }

        fn add_grouping(&mut self, bolt: &str, edge: GroupingSpec) -> Result<(), ValidationError> {
            self.calls.borrow_mut().push(GraphCall::AddGrouping {
                bolt: bolt.to_string(),
                edge,
            });
            Ok(())
        }

        fn build(self) -> Result<Vec<GraphCall>, ValidationError> {
            self.calls.borrow_mut().push(GraphCall::Build);
            Ok(self.calls())
        }
    }

    fn spec(yaml: &str) -> TopologySpec {
        TopologySpec::from_yaml_str(yaml).unwrap()
    }

    /// Returns the build result and the calls recorded up to the outcome.
    fn record(
        spec: &TopologySpec,
        registry: &ProviderRegistry,
    ) -> (Result<Vec<GraphCall>, Error>, Vec<GraphCall>) {
        let graph = RecordingGraph::default();
        let handle = graph.clone();
        let mut config = TopologyConfig::from_spec(spec);
        let result = build_topology(spec, registry, &mut config, graph);
        (result, handle.calls())
    }

    fn edge(grouping: Grouping, component: &str) -> GroupingSpec {
        GroupingSpec {
            grouping,
            component: component.to_string(),
            stream: None,
        }
    }

    const WORD_COUNT: &str = r#"
name: wc
serializer: json
topology:
  - spout:
      name: s1
      module: spouts.words
      output_fields: [word]
  - bolt:
      name: b1
      module: bolts.count
      groupings:
        - shuffle_grouping: {component: s1}
"#;

    #[test]
    fn word_count_compiles_to_worker_spout_bolt_and_shuffle_edge() {
        let registry = ProviderRegistry::with_builtins();
        let (result, _) = record(&spec(WORD_COUNT), &registry);
        let calls = result.unwrap();

        let mut spout =
            WorkerUnit::new("spouts.words", Default::default(), None, Default::default());
        spout.set_output_fields(OutputSchema::default_stream(["word"]));
        assert_eq!(
            calls,
            vec![
                GraphCall::SetSpout {
                    name: "s1".to_string(),
                    unit: SpoutUnit::Worker(spout),
                    parallelism: None,
                },
                GraphCall::SetBolt {
                    name: "b1".to_string(),
                    module: "bolts.count".to_string(),
                    parallelism: None,
                },
                GraphCall::AddGrouping {
                    bolt: "b1".to_string(),
                    edge: edge(Grouping::Shuffle, "s1"),
                },
                GraphCall::Build,
            ]
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let doc = r#"
name: t
topology:
  - bolt:
      name: split
      module: bolts.split
      output_fields: {default: [word], lengths: [n]}
      parallelism_hint: 3
      tasks: 6
      groupings:
        - shuffle_grouping: lines
        - all_grouping: {component: ticks}
  - spout: {name: lines, module: spouts.lines, output_fields: [line]}
  - spout: {name: ticks, module: spouts.ticks, output_fields: [t], tick_freq_secs: 2}
  - bolt:
      name: count
      module: bolts.count
      groupings:
        - fields_grouping: {component: split, fields: [word]}
        - global_grouping: {component: split, stream: lengths}
        - local_or_shuffle_grouping: lines
        - none_grouping: ticks
"#;
        let registry = ProviderRegistry::with_builtins();
        let spec = spec(doc);
        let first = record(&spec, &registry).0.unwrap();
        let second = record(&spec, &registry).0.unwrap();
        assert_eq!(first, second);
        // 4 vertices, 1 task override, 6 edges, build
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn tasks_are_applied_after_parallelism() {
        let (result, _) = record(
            &spec("name: t\ntopology:\n  - bolt: {name: b, module: m, parallelism_hint: 2, tasks: 4}"),
            &ProviderRegistry::with_builtins(),
        );
        let calls = result.unwrap();
        assert_eq!(
            &calls[..2],
            &[
                GraphCall::SetBolt {
                    name: "b".to_string(),
                    module: "m".to_string(),
                    parallelism: Some(2),
                },
                GraphCall::SetNumTasks {
                    name: "b".to_string(),
                    tasks: 4,
                },
            ]
        );
    }

    #[test]
    fn dangling_reference_fails_for_every_grouping_kind() {
        let registry = ProviderRegistry::with_builtins();
        for kind in [
            "shuffle_grouping: {component: ghost}",
            "global_grouping: {component: ghost}",
            "fields_grouping: {component: ghost, fields: [word]}",
            "local_or_shuffle_grouping: {component: ghost}",
            "none_grouping: {component: ghost}",
            "all_grouping: {component: ghost}",
        ] {
            let doc = format!(
                "name: t\ntopology:\n  - spout: {{name: s, module: m, output_fields: [word]}}\n  - bolt: {{name: b, module: m, groupings: [{{{}}}]}}",
                kind
            );
            let (result, calls) = record(&spec(&doc), &registry);
            match result.unwrap_err() {
                Error::Validation(ValidationError::DanglingReference { bolt, component }) => {
                    assert_eq!(bolt, "b");
                    assert_eq!(component, "ghost");
                }
                other => panic!("{kind}: unexpected error {other}"),
            }
            assert!(calls.is_empty(), "{kind}: graph was mutated");
        }
    }

    #[test]
    fn fields_grouping_must_use_declared_fields() {
        let doc = "name: t\ntopology:\n  - spout: {name: s, module: m, output_fields: [word]}\n  - bolt: {name: b, module: m, groupings: [{fields_grouping: {component: s, fields: [word, count]}}]}";
        let (result, calls) = record(&spec(doc), &ProviderRegistry::with_builtins());
        match result.unwrap_err() {
            Error::Validation(ValidationError::UndeclaredFields { fields, .. }) => {
                assert_eq!(fields, vec!["count".to_string()]);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(calls.is_empty());
    }

    #[test]
    fn grouping_on_undeclared_stream_fails() {
        let doc = "name: t\ntopology:\n  - spout: {name: s, module: m, output_fields: [word]}\n  - bolt: {name: b, module: m, groupings: [{shuffle_grouping: {component: s, stream: errors}}]}";
        let (result, _) = record(&spec(doc), &ProviderRegistry::with_builtins());
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation(ValidationError::UnknownStream { ref stream, .. }) if stream == "errors"
        ));
    }

    #[test]
    fn worker_spout_requires_output_fields_before_any_graph_call() {
        let registry = ProviderRegistry::with_builtins();
        let doc = "name: t\ntopology:\n  - bolt: {name: b, module: m}\n  - spout: {name: s, module: spouts.s}";
        let (result, calls) = record(&spec(doc), &registry);
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation(ValidationError::SpoutWithoutOutputFields { ref spout }) if spout == "s"
        ));
        assert!(calls.is_empty());

        let doc = "name: t\ntopology:\n  - bolt: {name: b, module: m}\n  - spout: {name: s, module: spouts.s, output_fields: [x]}";
        let (result, _) = record(&spec(doc), &registry);
        let calls = result.unwrap();
        assert!(matches!(
            &calls[1],
            GraphCall::SetSpout { unit: SpoutUnit::Worker(w), .. } if w.module == "spouts.s"
        ));
    }

    #[test]
    fn unregistered_type_falls_back_to_worker() {
        let doc = "name: t\ntopology:\n  - spout: {name: s, type: redis, module: spouts.redis, output_fields: [k]}";
        let (result, _) = record(&spec(doc), &ProviderRegistry::with_builtins());
        let calls = result.unwrap();
        assert!(matches!(
            &calls[0],
            GraphCall::SetSpout { unit: SpoutUnit::Worker(_), .. }
        ));
    }

    #[test]
    fn worker_spout_requires_module() {
        let doc = "name: t\ntopology:\n  - spout: {name: s, output_fields: [x]}";
        let (result, _) = record(&spec(doc), &ProviderRegistry::with_builtins());
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation(ValidationError::MissingField { ref field, .. }) if field == "module"
        ));
    }

    #[test]
    fn kafka_without_topic_is_a_resolution_error() {
        let doc = "name: t\ntopology:\n  - spout: {name: k, type: kafka, options: {zk_hosts: 'zk:2181'}}";
        let (result, calls) = record(&spec(doc), &ProviderRegistry::with_builtins());
        match result.unwrap_err() {
            Error::Resolution(ResolutionError::MissingOption { option, spout, .. }) => {
                assert_eq!(option, "topic");
                assert_eq!(spout, "k");
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(calls.is_empty());
    }

    #[test]
    fn provided_spout_schema_is_checked_before_any_graph_call() {
        let doc = "name: t\ntopology:\n  - spout: {name: k, type: kafka, options: {topic: a, zk_hosts: z}}\n  - bolt: {name: b, module: m, groupings: [{fields_grouping: {component: k, fields: [payload]}}]}";
        let registry = ProviderRegistry::with_builtins();
        let (result, calls) = record(&spec(doc), &registry);
        match result.unwrap_err() {
            Error::Validation(ValidationError::UndeclaredFields {
                component, fields, ..
            }) => {
                assert_eq!(component, "k");
                assert_eq!(fields, vec!["payload".to_string()]);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(calls.is_empty());

        let doc = doc.replace(
            "fields_grouping: {component: k, fields: [payload]}",
            "shuffle_grouping: {component: k, stream: errors}",
        );
        let (result, calls) = record(&spec(&doc), &registry);
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation(ValidationError::UnknownStream { ref stream, .. }) if stream == "errors"
        ));
        assert!(calls.is_empty());
    }

    #[test]
    fn provided_spout_compiles_to_native_unit() {
        let doc = "name: t\ntopology:\n  - spout: {name: k, type: kafka, options: {topic: a, zk_hosts: z}}\n  - bolt: {name: b, module: m, groupings: [{fields_grouping: {component: k, fields: [str]}}]}";
        let compiled = compile(&spec(doc), &ProviderRegistry::with_builtins()).unwrap();
        let k = compiled.topology.spout("k").unwrap();
        assert!(matches!(&k.unit, SpoutUnit::Native(n) if n.implementation == kafka::KIND));
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        field: &'static str,
    }

    impl SpoutProvider for Counting {
        fn provide(
            &self,
            ctx: &mut ProviderContext<'_>,
            _spec: &SpoutSpec,
        ) -> Result<SpoutUnit, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.config_mut().put("provider.marker", self.field);
            Ok(SpoutUnit::Native(NativeSpout {
                implementation: "counting".to_string(),
                config: Default::default(),
                output_fields: OutputSchema::default_stream([self.field]),
            }))
        }
    }

    #[test]
    fn override_replaces_provider_and_may_write_config() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let registry = ProviderRegistry::with_builtins();
        registry.register(
            "kafka",
            ProviderRef::new(
                "test:first",
                Counting {
                    calls: first.clone(),
                    field: "a",
                },
            ),
        );
        registry.register(
            "kafka",
            ProviderRef::new(
                "test:second",
                Counting {
                    calls: second.clone(),
                    field: "b",
                },
            ),
        );

        let compiled = compile(
            &spec("name: t\ntopology:\n  - spout: {name: k, type: kafka}"),
            &registry,
        )
        .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(
            compiled.config.get("provider.marker"),
            Some(&serde_json::json!("b"))
        );
    }

    #[test]
    fn submit_applies_mode() {
        let compiled = compile(&spec(WORD_COUNT), &ProviderRegistry::with_builtins()).unwrap();
        let mut out = crate::runtime::ManifestSubmitter::new(Vec::new());
        compiled.submit(SubmitMode::Cluster, &mut out).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out.into_inner()).unwrap();
        assert_eq!(doc["config"]["topology.debug"], serde_json::json!(false));
        assert_eq!(doc["topology"]["bolts"][0]["name"], "b1");
    }
}
