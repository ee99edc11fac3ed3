//! Basal tracker CLI library.
//!
//! This crate provides the CLI interface for the basal-rate tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{Config, LlmConfig, default_config_file};
