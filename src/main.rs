use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use topology_builder::config::{self, BuilderConfig, ProviderOverride};
use topology_builder::runtime::{ManifestSubmitter, SubmitMode};
use topology_builder::{ProviderRegistry, TopologySpec};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "topology-builder")]
#[command(about = "Compile a topology document into a runtime graph", long_about = None)]
struct Cli {
    /// Register a spout provider: KIND=REFERENCE (repeatable, last wins).
    #[arg(long = "provider", value_name = "KIND=REFERENCE", global = true)]
    providers: Vec<ProviderOverride>,

    /// Builder config file with a `plugins` mapping.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a topology and write its submission document.
    Compile {
        #[arg(long)]
        topology: PathBuf,

        /// Output file; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Submit for ephemeral local execution instead of a cluster.
        #[arg(long)]
        local: bool,

        /// Enable runtime debug output (local mode only).
        #[arg(long, requires = "local")]
        debug: bool,
    },

    /// List registered spout providers.
    Providers,
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(config::normalize_provider_args(std::env::args()));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 1) Registry: built-ins, then config plugins, then CLI overrides.
    let registry = ProviderRegistry::global();
    if let Some(path) = &cli.config {
        let builder_config = BuilderConfig::load(path)?;
        registry.apply_overrides(&builder_config.overrides())?;
    }
    registry.apply_overrides(&cli.providers)?;

    match cli.cmd {
        Commands::Compile {
            topology,
            out,
            local,
            debug,
        } => {
            // 2) Parse + validate the topology document.
            let spec = TopologySpec::from_path(&topology)?;

            // 3) Compile against the registry.
            let compiled = topology_builder::compile(&spec, registry)
                .with_context(|| format!("compile topology {}", topology.display()))?;

            // 4) Submit.
            let mode = if local {
                SubmitMode::Local { debug }
            } else {
                SubmitMode::Cluster
            };
            match out {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("create {}", path.display()))?;
                    compiled.submit(mode, &mut ManifestSubmitter::new(file))?;
                    println!("Wrote {}", path.display());
                }
                None => {
                    compiled.submit(mode, &mut ManifestSubmitter::new(std::io::stdout().lock()))?
                }
            }
        }
        Commands::Providers => {
            for (kind, reference) in registry.registrations() {
                println!("{}\t{}", kind, reference);
            }
            for reference in registry.catalog() {
                println!("# available: {}", reference);
            }
        }
    }

    Ok(())
}
