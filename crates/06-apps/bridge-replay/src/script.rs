//! Replay script format.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bridge_queue::Value;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One host-side action.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Inbound call to a script-side module.
    Call {
        module: String,
        method: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
    /// Completion of an outbound call, addressed by encoded callback id.
    Callback {
        id: u64,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
    /// Drain without an inbound call.
    Flush,
}

pub fn load(path: &Path) -> Result<Script> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read script {path:?}"))?;
    parse(&text).with_context(|| format!("failed to parse script {path:?}"))
}

pub fn parse(text: &str) -> Result<Script> {
    Ok(serde_json::from_str(text)?)
}

pub fn to_values(args: Vec<serde_json::Value>) -> Vec<Value> {
    args.into_iter().map(Value::from).collect()
}
