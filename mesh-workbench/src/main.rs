mod cli;

use crate::cli::CliOpt;
use anyhow::Context;
use clap::Parser;
use mesh_sim::network::forward::ForwardingConfig;
use mesh_sim::network::spec::{NetworkSpec, TrafficSpec};
use mesh_sim::sim::Simulation;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Deserialize)]
struct ScenarioJson {
    network: NetworkSpec,
    traffic: TrafficSpec,
}

fn main() -> anyhow::Result<()> {
    let opt = CliOpt::parse();

    let json = fs::read_to_string(&opt.network_graph)
        .with_context(|| format!("failed to read {}", opt.network_graph.display()))?;
    let scenario: ScenarioJson =
        serde_json::from_str(&json).context("failed to parse the network graph file")?;

    let seed = if opt.non_deterministic {
        fastrand::u64(..)
    } else {
        opt.seed
    };
    let config = ForwardingConfig {
        duplicate_unicast_signal: !opt.single_unicast_signal,
    };

    let mut simulation = Simulation::new(scenario.network, scenario.traffic, config, seed)
        .context("failed to initialize the simulation")?;
    simulation.run_until(Duration::from_millis(opt.duration_ms));

    println!();
    print!("{}", simulation.stats());

    Ok(())
}
