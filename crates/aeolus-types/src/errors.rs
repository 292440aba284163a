//! # aeolus-types::errors
//!
//! Defines the common error types used throughout the Aeolus workspace.
//! Using `thiserror` provides clean, descriptive error handling. All error
//! variants must have a deterministic `Debug` implementation for
//! reproducibility.
//!
//! Two families exist. `ConfigError` covers bad input at startup and is
//! propagated up to `main` for a nonzero exit. `SimError` names simulator
//! invariant violations; those indicate bugs, and the sites that detect
//! them abort with the corresponding message rather than propagating.

use crate::{id::SourceId, time::SimTime};
use thiserror::Error;

/// A general-purpose error for the simulation engine.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("event scheduled into the past: due {due} < now {now}")]
    PastTimeSchedule { due: SimTime, now: SimTime },
    #[error("simulation time overflow: {base} + {offset}")]
    TimeOverflow { base: SimTime, offset: SimTime },
    #[error("simulation time underflow: {base} - {offset}")]
    TimeUnderflow { base: SimTime, offset: SimTime },
    #[error("route cursor overran: hop {hop} of {len}")]
    RouteOverrun { hop: u32, len: u32 },
    #[error("event source {0} fired but was never attached")]
    UnknownSource(SourceId),
    #[error("monotonic ID counter overflowed")]
    IdOverflow,
}

/// An error related to parsing or validating run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("flow trace line {line}: {message}")]
    Trace { line: usize, message: String },
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}
