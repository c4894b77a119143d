//! JSON Schema of the native document

use crate::encode::encoding_failed;
use crate::error::Result;
use crate::models::Snapshot;

/// Draft 7 JSON Schema of [`Snapshot`], pretty-printed
pub fn snapshot_schema() -> Result<String> {
    let schema = schemars::schema_for!(Snapshot);
    let mut text = serde_json::to_string_pretty(&schema).map_err(encoding_failed)?;
    text.push('\n');
    Ok(text)
}
