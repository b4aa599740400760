//! # License Subcommand
//!
//! Checks license numbers against the `AAA99999` grammar without touching
//! the service. Values come from the command line, from a file (one per
//! line, blank lines and `#` comments skipped), or both.
//!
//! Each value is trimmed first, the same way driver forms clean it.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use taxi_core::form::clean_license_number;

/// Arguments for the `taxi license` subcommand.
#[derive(Args, Debug)]
pub struct LicenseArgs {
    #[command(subcommand)]
    pub command: LicenseCommand,
}

/// License subcommands.
#[derive(Subcommand, Debug)]
pub enum LicenseCommand {
    /// Check license numbers and report which rule each one breaks.
    Check(CheckArgs),
}

/// Arguments for `taxi license check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// License numbers to check.
    #[arg(value_name = "VALUE")]
    pub values: Vec<String>,

    /// Read additional license numbers from a file, one per line.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print results as a JSON array instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Outcome of checking one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub value: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Check a single value.
pub fn check(value: &str) -> CheckResult {
    match clean_license_number(value) {
        Ok(_) => CheckResult {
            value: value.to_string(),
            valid: true,
            rule: None,
            message: None,
        },
        Err(e) => CheckResult {
            value: value.to_string(),
            valid: false,
            rule: Some(e.rule()),
            message: Some(e.to_string()),
        },
    }
}

/// Read values from a file, skipping blank lines and `#` comments.
fn read_values(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(str::to_string)
        .collect())
}

/// Execute the license subcommand, writing the report to `out`.
///
/// Returns exit code: 0 when every value is valid, 1 otherwise.
pub fn run_license(args: &LicenseArgs, out: &mut impl Write) -> Result<u8> {
    match &args.command {
        LicenseCommand::Check(check_args) => run_check(check_args, out),
    }
}

fn run_check(args: &CheckArgs, out: &mut impl Write) -> Result<u8> {
    let mut values = args.values.clone();
    if let Some(path) = &args.file {
        let from_file = read_values(path)?;
        tracing::debug!(path = %path.display(), count = from_file.len(), "read license numbers");
        values.extend(from_file);
    }
    if values.is_empty() {
        bail!("no license numbers given; pass values or --file PATH");
    }

    let results: Vec<CheckResult> = values.iter().map(|v| check(v)).collect();
    let failed = results.iter().filter(|r| !r.valid).count();

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &results).context("failed to write JSON")?;
        writeln!(out)?;
    } else {
        for result in &results {
            match &result.message {
                None => writeln!(out, "  PASS: {}", result.value)?,
                Some(message) => writeln!(out, "  FAIL: {:?}: {message}", result.value)?,
            }
        }
        writeln!(
            out,
            "License numbers: {}/{} valid",
            results.len() - failed,
            results.len()
        )?;
    }

    tracing::info!(total = results.len(), failed, "license check finished");
    Ok(u8::from(failed > 0))
}
