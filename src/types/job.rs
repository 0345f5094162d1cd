use crate::{Error, Result};

use serde::Deserialize;

/// One unit of work, executed as a separate worker process.
///
/// A job description can also be read from JSON shaped like
/// `{"cmd": "...", "data": ..., "pipe": ..., "argv": ["..."]}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct Job {
    /// Command handed to the worker as `--cmd`.
    #[serde(rename = "cmd")]
    pub command: String,
    /// Structured payload handed to the worker as `--data`.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Structured payload handed to the worker as `--pipe`.
    #[serde(default)]
    pub pipe: Option<serde_json::Value>,
    /// Raw argv tokens appended after every other worker argument.
    #[serde(default, rename = "argv")]
    pub args: Vec<String>,
}

impl Job {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: None,
            pipe: None,
            args: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_pipe(mut self, pipe: serde_json::Value) -> Self {
        self.pipe = Some(pipe);
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build a job from a JSON description. A missing or malformed `cmd` is `Error::InvalidInput`.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let job: Job = serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("job description: {e}")))?;
        job.validate()?;
        Ok(job)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::invalid_input("job command must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn from_value_reads_all_fields() {
        let job = Job::from_value(serde_json::json!({
            "cmd": "report/daily",
            "data": {"day": 3},
            "pipe": [1, 2],
            "argv": ["--verbose"]
        }))
        .expect("valid job");
        assert_eq!(job.command, "report/daily");
        assert_eq!(job.data, Some(serde_json::json!({"day": 3})));
        assert_eq!(job.pipe, Some(serde_json::json!([1, 2])));
        assert_eq!(job.args, vec!["--verbose"]);
    }

    #[test]
    fn from_value_requires_cmd() {
        let err = Job::from_value(serde_json::json!({"data": {"x": 1}})).expect_err("must fail");
        let Error::InvalidInput { context } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(context.contains("cmd"), "{context}");
    }

    #[test]
    fn blank_command_is_rejected() {
        let err = Job::new("  ").validate().expect_err("must fail");
        let Error::InvalidInput { .. } = err else {
            panic!("unexpected error: {err:?}");
        };
    }

    #[test]
    fn builder_appends_args_in_order() {
        let job = Job::new("x").with_args(["a", "b"]).with_args(vec!["c".to_string()]);
        assert_eq!(job.args, vec!["a", "b", "c"]);
    }
}
