use serde::Serialize;

use std::time::Duration;

/// Output collected from a worker's stdout.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ResultData {
    /// Raw text (empty output, or output that is not valid JSON).
    Text(String),
    /// Output decoded as a JSON value.
    Json(serde_json::Value),
}

impl ResultData {
    /// Decode collected output: empty stays empty text, valid JSON (other than `null`) becomes
    /// `Json`, anything else is kept as text.
    pub(crate) fn decode(text: String) -> Self {
        if text.is_empty() {
            return ResultData::Text(text);
        }
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Null) | Err(_) => ResultData::Text(text),
            Ok(value) => ResultData::Json(value),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResultData::Text(s) => Some(s),
            ResultData::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResultData::Json(v) => Some(v),
            ResultData::Text(_) => None,
        }
    }
}

impl Default for ResultData {
    fn default() -> Self {
        ResultData::Text(String::new())
    }
}

/// Why a job did not complete normally.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum JobFailure {
    /// The worker process could not be created.
    Spawn { detail: String },
    /// Reading the worker's stdout failed before end-of-stream.
    Read { detail: String },
    /// The worker was still running when the deadline expired and was killed.
    TimedOut { timeout: Duration },
}

/// Per-job result of `Controller::commit`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ResultEntry {
    /// Position of the job in submission order.
    pub index: usize,
    /// `true` when the worker spawned and its stdout was collected to end-of-stream.
    ///
    /// A non-zero exit code does not clear this flag; see `exit_code`.
    pub success: bool,
    /// The job's command, as submitted.
    pub command: String,
    /// Collected stdout.
    pub data: ResultData,
    /// Captured stderr, bounded by `ControllerOptions::stderr_max_bytes`.
    pub stderr: String,
    /// Exit code of the reaped worker, when it exited normally.
    pub exit_code: Option<i32>,
    /// Set when `success` is `false`.
    pub failure: Option<JobFailure>,
}

impl ResultEntry {
    pub(crate) fn failed(index: usize, command: String, failure: JobFailure) -> Self {
        Self {
            index,
            success: false,
            command,
            data: ResultData::default(),
            stderr: String::new(),
            exit_code: None,
            failure: Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn decode_json_object() {
        let data = ResultData::decode(r#"{"ok":true}"#.to_string());
        assert_eq!(data, ResultData::Json(serde_json::json!({"ok": true})));
    }

    #[test]
    fn decode_scalars_and_arrays() {
        assert_eq!(
            ResultData::decode("42".to_string()),
            ResultData::Json(serde_json::json!(42))
        );
        assert_eq!(
            ResultData::decode(r#"["a"]"#.to_string()),
            ResultData::Json(serde_json::json!(["a"]))
        );
    }

    #[test]
    fn decode_falls_back_to_text() {
        assert_eq!(
            ResultData::decode("plain text".to_string()),
            ResultData::Text("plain text".to_string())
        );
        assert_eq!(
            ResultData::decode("null".to_string()),
            ResultData::Text("null".to_string())
        );
    }

    #[test]
    fn empty_output_stays_empty_text() {
        assert_eq!(ResultData::decode(String::new()).as_text(), Some(""));
    }

    #[test]
    fn entry_serializes_data_untagged() {
        let entry = ResultEntry {
            index: 3,
            success: true,
            command: "a/b".to_string(),
            data: ResultData::Json(serde_json::json!({"ok": true})),
            stderr: String::new(),
            exit_code: Some(0),
            failure: None,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["data"], serde_json::json!({"ok": true}));
        assert_eq!(v["index"], 3);

        let failed = ResultEntry::failed(
            1,
            "x".to_string(),
            JobFailure::Spawn {
                detail: "not found".to_string(),
            },
        );
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["data"], "");
        assert_eq!(v["failure"]["kind"], "spawn");
    }
}
