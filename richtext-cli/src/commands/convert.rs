//! Static conversion between snapshots and HTML

use super::{emit, read_snapshot};
use anyhow::{Context, Result};
use std::path::Path;

/// Render a snapshot with the default HTML converters
pub fn to_html(input: &Path, output: Option<&Path>) -> Result<()> {
    let tree = read_snapshot(input)?;
    let html = markup::convert_to_html(&tree.to_snapshot());
    emit(&html, output)
}

/// Import an HTML fragment and print its snapshot
pub fn from_html(input: &Path, output: Option<&Path>) -> Result<()> {
    let html = std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let tree = markup::import_html(&html).with_context(|| format!("Failed to import {}", input.display()))?;
    let json = serde_json::to_string_pretty(&tree.to_snapshot())?;
    emit(&json, output)
}
