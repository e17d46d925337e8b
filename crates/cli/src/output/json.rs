//! JSON output. Pretty-printing lives in serde_json; this module exists so
//! the format split mirrors its siblings.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
