//! # aeolus-cli
//!
//! The main entry point for the `aeolus` binary. It parses command-line
//! arguments, initializes logging and dispatches into the run wiring.
//! Configuration problems are reported once to stderr and exit nonzero
//! before the simulation starts.

#![forbid(unsafe_code)]

use crate::args::{Cli, LogFormat};
use anyhow::Result;
use clap::Parser;

mod args;
mod run;
mod trace;

fn main() -> Result<()> {
    let args = Cli::parse();

    match args.log {
        LogFormat::Human => tracing_subscriber::fmt().with_env_filter("info").init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter("info")
            .init(),
    }

    run::exec(args)
}
