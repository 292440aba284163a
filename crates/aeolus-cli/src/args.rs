//! # aeolus-cli::args
//!
//! Defines the command-line argument structure using `clap`.

use aeolus_types::config::RouteStrategy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "aeolus", author, version, about = "NDP over a fat-tree, with trimming switches")]
pub struct Cli {
    /// Log file path.
    #[arg(short = 'o', long = "out", default_value = "logout.dat")]
    pub out: PathBuf,

    /// Subflow count per connection.
    #[arg(long = "sub", default_value_t = 1)]
    pub subflows: u32,

    /// Number of connections to generate.
    #[arg(long)]
    pub conns: u32,

    /// Number of hosts in the topology; rounded up to the next fat-tree.
    #[arg(long, default_value_t = 128)]
    pub nodes: u32,

    /// Initial window in MTU-sized packets.
    #[arg(long, default_value_t = 23)]
    pub cwnd: u32,

    /// Per-port buffer size in MTU-sized packets.
    #[arg(short = 'q', long = "queue", default_value_t = 8)]
    pub queue: u32,

    /// Flow trace file: one `<size_bytes> <start_secs>` pair per line.
    #[arg(long)]
    pub trace: PathBuf,

    /// Routing strategy.
    #[arg(long, value_enum, default_value_t = Strat::Perm)]
    pub strat: Strat,

    /// RNG seed.
    #[arg(long, default_value_t = 13)]
    pub seed: u64,

    /// Simulated end time in seconds.
    #[arg(long, default_value_t = 2.001)]
    pub end: f64,

    /// First-RTT drop threshold in MTU-sized packets.
    #[arg(long, default_value_t = 0)]
    pub drop_thresh: u32,

    /// Write a JSON summary of run totals to this path.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    #[arg(long, default_value = "human")]
    pub log: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strat {
    Perm,
    Rand,
    Pull,
    Single,
}

impl From<Strat> for RouteStrategy {
    fn from(s: Strat) -> Self {
        match s {
            Strat::Perm => RouteStrategy::ScatterPermute,
            Strat::Rand => RouteStrategy::ScatterRandom,
            Strat::Pull => RouteStrategy::PullBased,
            Strat::Single => RouteStrategy::SinglePath,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}
