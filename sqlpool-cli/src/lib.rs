//! sqlpool CLI.
//!
//! Benchmarks pooled connections against a single long-lived connection and
//! a connection per query, and prints pool status.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
