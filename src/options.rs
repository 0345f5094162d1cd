use crate::codec::ArgEncoding;
use crate::{Error, Result};

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the worker executable path (see [`ControllerOptions::from_env`]).
pub const WORKER_PROGRAM_ENV: &str = "MPCTL_WORKER";

/// Environment variable holding whitespace-separated fixed worker arguments.
pub const WORKER_ARGS_ENV: &str = "MPCTL_WORKER_ARGS";

/// Configuration options for `Controller`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ControllerOptions {
    /// Worker executable. `Controller::commit` fails with `Error::Configuration` when unset.
    pub worker_program: Option<PathBuf>,

    /// Fixed entry-point arguments placed between the program and `--cmd`.
    pub worker_args: Vec<String>,

    /// Maximum number of workers alive at once (batch size).
    pub concurrency_limit: usize,

    /// Whether `commit` collects results (`true`) or detaches after spawning (`false`).
    pub wait: bool,

    /// Per-job deadline measured from spawn. `None` waits for end-of-stream indefinitely.
    pub deadline: Option<Duration>,

    /// How `--cmd`, `--data` and `--pipe` values are encoded on the worker argv.
    pub encoding: ArgEncoding,

    /// Upper bound of a single stdout read.
    pub max_line_bytes: usize,

    /// Stderr bytes kept per job; the rest is drained and discarded.
    pub stderr_max_bytes: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            worker_program: None,
            worker_args: Vec::new(),
            concurrency_limit: 10,
            wait: true,
            deadline: None,
            encoding: ArgEncoding::default(),
            max_line_bytes: 4096,
            stderr_max_bytes: 8 * 1024,
        }
    }
}

impl ControllerOptions {
    /// Defaults with the worker resolved from `MPCTL_WORKER` / `MPCTL_WORKER_ARGS`.
    ///
    /// Blank values are treated as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Set the worker executable and its fixed entry-point arguments.
    pub fn with_worker<I, S>(mut self, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.worker_program = Some(program.into());
        self.worker_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(program) = lookup(WORKER_PROGRAM_ENV).filter(|v| !v.trim().is_empty()) {
            opts.worker_program = Some(PathBuf::from(program.trim()));
        }
        if let Some(args) = lookup(WORKER_ARGS_ENV) {
            opts.worker_args = args.split_whitespace().map(str::to_string).collect();
        }
        opts
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_concurrency_limit(self.concurrency_limit)?;
        if self.deadline == Some(Duration::from_secs(0)) {
            return Err(Error::invalid_input("deadline must be > 0"));
        }
        if self.max_line_bytes == 0 {
            return Err(Error::invalid_input("max_line_bytes must be > 0"));
        }
        if let Some(program) = &self.worker_program {
            if program.as_os_str().is_empty() {
                return Err(Error::invalid_input("worker_program must not be empty"));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_concurrency_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::invalid_input("concurrency_limit must be > 0"));
    }
    Ok(())
}
