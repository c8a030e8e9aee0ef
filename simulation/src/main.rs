//! Mirrorsim - mirror churn over typed structures
//!
//! Runs configured simulations, prints topologies and walks through the
//! pre-built scenarios.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use mirrorsim_logging::{LogConfig, SubscriberBuilder};

use mirrorsim_simulation::{SimConfig, Simulation, TopologyBuilder, TopologySpec, scenarios};

#[derive(Parser)]
#[command(
    name = "mirrorsim",
    about = "Mirror churn simulation over typed multi-structure topologies",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a JSON configuration file
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Build and print a topology
    Topology {
        shape: ShapeArg,

        /// Number of mirrors
        #[arg(short, long, default_value = "6")]
        mirrors: usize,

        /// Connectivity degree for n-connected
        #[arg(long, default_value = "2")]
        degree: usize,

        /// Children per member for tree, depth-limited and balanced trees
        #[arg(long, default_value = "2")]
        fanout: usize,

        /// Depth bound for depth-limited trees
        #[arg(long, default_value = "3")]
        max_depth: usize,

        /// Balance score bound for balanced trees
        #[arg(long, default_value = "1.0")]
        max_deviation: f64,
    },

    /// Run a pre-built scenario (tree, ring, n-connected, churn)
    Scenario { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Tree,
    Line,
    Balanced,
    DepthLimited,
    Ring,
    Star,
    Full,
    NConnected,
}

impl ShapeArg {
    fn spec(self, degree: usize, fanout: usize, max_depth: usize, max_deviation: f64) -> TopologySpec {
        match self {
            ShapeArg::Tree => TopologySpec::Tree,
            ShapeArg::Line => TopologySpec::Line,
            ShapeArg::Balanced => TopologySpec::BalancedTree {
                target_links_per_node: fanout,
                max_deviation,
            },
            ShapeArg::DepthLimited => TopologySpec::DepthLimitedTree { max_depth },
            ShapeArg::Ring => TopologySpec::Ring,
            ShapeArg::Star => TopologySpec::Star,
            ShapeArg::Full => TopologySpec::FullyConnected,
            ShapeArg::NConnected => TopologySpec::NConnected { degree },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = SubscriberBuilder::new()
        .with_config(LogConfig::cli(cli.verbose))
        .try_init()
        .context("failed to initialize logging")?;

    match cli.command {
        Commands::Run { config } => {
            let sim_config = SimConfig::from_path(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let mut sim = Simulation::new(sim_config)?;
            println!("{}", sim.topology.visualize());
            sim.run()?;
            println!("{}", sim.topology.visualize());
            scenarios::print_stats(&sim);
        }
        Commands::Topology {
            shape,
            mirrors,
            degree,
            fanout,
            max_depth,
            max_deviation,
        } => {
            let spec = shape.spec(degree, fanout, max_depth, max_deviation);
            let topology = TopologyBuilder::new(mirrors).with_fanout(fanout).build(spec)?;
            println!("{}", topology.visualize());
        }
        Commands::Scenario { name } => {
            scenarios::run_named(&name)?;
        }
    }

    Ok(())
}
