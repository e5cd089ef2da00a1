//! JSON report file

use anyhow::{Context, Result};
use log_sifter::SiftReport;
use std::fs;
use std::path::Path;

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "sifter_output.json";

pub fn to_json_string(report: &SiftReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Write the report to `path`, replacing any existing file
pub fn write_json(report: &SiftReport, path: &Path) -> Result<()> {
    let json = to_json_string(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write JSON report: {:?}", path))?;
    log::info!("Wrote JSON report to {:?}", path);
    Ok(())
}
