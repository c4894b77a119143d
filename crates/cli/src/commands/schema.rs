//! Schema command

use anyhow::{Context, Result};
use kbom_lib::schema::snapshot_schema;

/// Print the JSON schema of the native document to stdout
pub fn run() -> Result<()> {
    let schema = snapshot_schema().context("Failed to render schema")?;
    print!("{}", schema);
    Ok(())
}
