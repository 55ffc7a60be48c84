//! Desired and state documents on disk.
//!
//! A `.json` file is parsed as JSON; anything else as YAML, which also
//! accepts JSON content.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn load(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse(path, &content).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse(path: &Path, content: &str) -> Result<Value> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}
