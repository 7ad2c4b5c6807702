//! Link-state routing simulator binary.
//!
//! Generates a random connected topology, starts one agent per router,
//! runs an initial discovery round and then hands control to the operator
//! menu until shutdown.

use anyhow::Context;
use clap::Parser;
use linkstate_agent::Network;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;
mod menu;

use config::SimConfig;
use logging::SimLogFormatter;

/// Link-state routing network simulator
#[derive(Parser, Debug)]
#[command(name = "linkstate-sim", version, about = "Link-state routing network simulator")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "linkstate.yaml")]
    config: PathBuf,

    /// Number of routers
    #[arg(long)]
    nodes: Option<usize>,

    /// Maximum links per router
    #[arg(long)]
    max_edges: Option<usize>,

    /// Upper bound of random link weights
    #[arg(long)]
    weight_ceiling: Option<u32>,

    /// Seed for topology generation and traffic
    #[arg(long)]
    seed: Option<u64>,

    /// Route computation threads, 0 for available parallelism
    #[arg(long)]
    workers: Option<usize>,

    /// Upper bound on one discovery round, e.g. 30s
    #[arg(long)]
    discovery_timeout: Option<humantime::Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run the initial discovery round and exit
    #[arg(long)]
    non_interactive: bool,

    /// Print every routing table as JSON after the initial round
    #[arg(long)]
    dump_routes: bool,
}

impl Args {
    /// Command line flags take precedence over file and environment
    fn apply_to(&self, config: &mut SimConfig) {
        if let Some(nodes) = self.nodes {
            config.nodes = nodes;
        }
        if let Some(max_edges) = self.max_edges {
            config.max_edges = max_edges;
        }
        if let Some(ceiling) = self.weight_ceiling {
            config.weight_ceiling = ceiling;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = &self.discovery_timeout {
            config.discovery_timeout = **timeout;
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("warn")
        .add_directive(format!("linkstate_sim={}", args.log_level).parse()?)
        .add_directive(format!("linkstate_agent={}", args.log_level).parse()?)
        .add_directive(format!("linkstate_routing={}", args.log_level).parse()?)
        .add_directive(format!("linkstate_topology={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .event_format(SimLogFormatter::new("linkstate-sim"))
        .init();

    info!("Starting link-state simulator v{}", env!("CARGO_PKG_VERSION"));

    let mut sim_config = SimConfig::load_from_file(&args.config)?;
    args.apply_to(&mut sim_config);
    sim_config.validate().context("invalid configuration")?;
    component_info!(
        "config",
        "{} routers, at most {} links each, weights up to {}, seed {:?}",
        sim_config.nodes,
        sim_config.max_edges,
        sim_config.weight_ceiling,
        sim_config.seed
    );

    let mut rng = match sim_config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let topology = sim_config.topology().generate(&mut rng);
    component_info!(
        "topology",
        "Generated {} routers with {} links",
        topology.node_count(),
        topology.link_count()
    );
    for (link, weight) in topology.links() {
        component_debug!("topology", "{} weight {}", link, weight);
    }

    let network = Network::launch(topology, sim_config.network()).await?;

    menu::print_discovery(network.discovery_round(&mut rng).await);

    if args.dump_routes {
        let epoch = network.epoch().await;
        let tables: Vec<_> = epoch.tables().iter().map(|table| table.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&tables)?);
    }

    if !args.non_interactive {
        let mut console = menu::Console::new();
        if let Err(e) = menu::run(&network, &mut console, &mut rng).await {
            component_error!("menu", "Console failed: {:#}", e);
        }
    }

    let stats = network.shutdown().await?;
    info!(
        "Simulator stopped: {} forwarded, {} acknowledged, {} dead letters, {} topology changes",
        stats.forwarded, stats.acknowledged, stats.dead_letters, stats.topology_changes
    );
    Ok(())
}
