//! # aeolus-types
//!
//! This crate provides the foundational, shared data types used across the
//! entire Aeolus workspace. Its purpose is to break dependency cycles by
//! providing a stable, central location for types that `aeolus-engine`,
//! `aeolus-ndp`, and `aeolus-cli` all need to agree upon.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod id;
pub mod metrics;
pub mod time;
