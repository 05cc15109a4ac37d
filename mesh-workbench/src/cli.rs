use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct CliOpt {
    /// Path to the JSON file containing the network graph and traffic
    /// parameters
    #[arg(long)]
    pub network_graph: PathBuf,

    /// How long the simulation should run, in simulated milliseconds
    #[arg(long, default_value_t = 60_000)]
    pub duration_ms: u64,

    /// The random seed used for traffic generation (destination choice and
    /// inter-arrival times)
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Whether the run should be non-deterministic, i.e. using a non-constant
    /// seed for the random number generator
    #[arg(long)]
    pub non_deterministic: bool,

    /// Emit the output-interface signal only once when a converter falls back
    /// from selective flood to plain unicast (historically it is emitted
    /// twice on that path)
    #[arg(long)]
    pub single_unicast_signal: bool,
}
