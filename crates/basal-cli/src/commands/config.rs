//! Config command for printing the effective configuration.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::Config;

#[derive(Debug, Serialize)]
struct JsonConfig<'a> {
    config_file: Option<PathBuf>,
    #[serde(flatten)]
    config: &'a Config,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, config_file: Option<PathBuf>) -> Result<()> {
    let output = JsonConfig {
        config_file,
        config,
    };
    writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}
