//! CLI subcommand implementations.

pub mod add;
pub mod ask;
pub mod config;
pub mod delete;
pub mod list;
pub mod show;
pub mod util;
