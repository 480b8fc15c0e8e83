//! Parseable lifecycle messages: newline-delimited JSON with
//! lexicographically sorted fields and `/` escaped as `\/`, a structured
//! sink for job lifecycle events instead of bare log lines.

use serde::Serialize;
use std::collections::BTreeMap;

/// A path/type pair as it appears in a `began` message's `outputs` array.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "message")]
pub enum LifecycleMessage {
    #[serde(rename = "began")]
    Began {
        kind: String,
        name: String,
        pid: i64,
        process: ProcessInfo,
        inputs: Vec<String>,
        outputs: Vec<OutputEntry>,
        command_executable: String,
        command_arguments: Vec<String>,
    },
    #[serde(rename = "finished")]
    Finished {
        kind: String,
        name: String,
        pid: i64,
        process: ProcessInfo,
        #[serde(rename = "exit-status")]
        exit_status: i32,
        output: String,
    },
    #[serde(rename = "signalled")]
    Signalled {
        kind: String,
        name: String,
        pid: i64,
        process: ProcessInfo,
        output: String,
        #[serde(rename = "error-message")]
        error_message: String,
        signal: i32,
    },
    #[serde(rename = "abnormal-exit")]
    AbnormalExit { kind: String, name: String, pid: i64, process: ProcessInfo, exception: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub real_pid: i64,
}

/// Serializes `message` as one line of JSON with keys sorted
/// lexicographically and `/` escaped as `\/`.
pub fn to_line(message: &LifecycleMessage) -> crate::error::Result<String> {
    let value = serde_json::to_value(message)?;
    let sorted = sort_keys(value);
    let rendered = serde_json::to_string(&sorted)?;
    Ok(rendered.replace('/', "\\/"))
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<String, serde_json::Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
