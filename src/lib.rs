//! mpctl is a multi-process job controller: it takes a batch of independent jobs, runs each one
//! as a separate worker process, multiplexes over the workers' pipes while they run and returns
//! one structured result per job once every worker has finished.
//!
//! Jobs are executed in batches of at most `concurrency_limit` workers. Batches run strictly one
//! after another; the workers of a batch run in parallel.
//!
//! ## Quick start
//! ```no_run
//! use mpctl::{Controller, ControllerOptions, Job};
//!
//! async fn run() -> Result<(), mpctl::Error> {
//!     let opts = ControllerOptions::default().with_worker("/usr/bin/php", ["/srv/app/api.php"]);
//!     let mut ctl = Controller::new(opts)?;
//!     ctl.add(Job::new("report/daily"))?
//!         .add(Job::new("report/weekly").with_data(serde_json::json!({"week": 12})))?;
//!
//!     for (index, entry) in ctl.commit().await? {
//!         println!("{index}: success={} data={:?}", entry.success, entry.data);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Worker contract
//! Each worker is started without a shell as
//! `<program> <worker_args..> --cmd <enc> [--data <enc>] [--pipe <enc>] [job args..] [--no-result]`
//! where `<enc>` is the value encoded with `ArgEncoding` (default: URL-safe base64) and the
//! `--data`/`--pipe` values are JSON. Whatever the worker writes to stdout, trimmed line by line
//! and concatenated, is decoded as JSON when possible and kept as text otherwise.
//!
//! ## Failure isolation
//! A worker that fails to spawn, breaks its stdout pipe or outlives `ControllerOptions::deadline`
//! yields an entry with `success == false`; its siblings are unaffected. Without a deadline a
//! worker that never closes stdout stalls its batch.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::dbg_macro)]

#[cfg(all(feature = "rt-async-io", feature = "rt-tokio"))]
compile_error!("features `rt-async-io` and `rt-tokio` are mutually exclusive; enable exactly one.");

#[cfg(not(any(feature = "rt-async-io", feature = "rt-tokio")))]
compile_error!(
    "missing runtime feature: enable one of `rt-async-io` or `rt-tokio` (default enables `rt-async-io`)."
);

#[cfg(feature = "blocking")]
mod blocking_api;
mod codec;
mod collector;
mod error;
mod launcher;
mod options;
mod planner;
mod runtime;
mod types;
mod util;

pub use crate::codec::ArgEncoding;
pub use crate::error::{Error, Result};
pub use crate::options::{ControllerOptions, WORKER_ARGS_ENV, WORKER_PROGRAM_ENV};
pub use crate::types::job::Job;
pub use crate::types::result::{JobFailure, ResultData, ResultEntry};

#[cfg(feature = "blocking")]
pub use crate::blocking_api::BlockingController;

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-job results keyed by submission index.
pub type Results = BTreeMap<usize, ResultEntry>;

/// Owns a job queue and runs it as worker processes on `commit`.
///
/// Each controller is independent: its queue, limits and worker configuration are not shared
/// with any other instance.
#[derive(Debug)]
pub struct Controller {
    opts: ControllerOptions,
    queue: Vec<Job>,
}

impl Controller {
    /// Create a controller. Fails with `Error::InvalidInput` on unusable limits.
    ///
    /// A missing `worker_program` is only reported by `commit`.
    pub fn new(opts: ControllerOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            queue: Vec::new(),
        })
    }

    /// Create a controller configured from `MPCTL_WORKER` / `MPCTL_WORKER_ARGS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ControllerOptions::from_env())
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.opts
    }

    /// Queue a job. Jobs run in submission order of their indices; returns `self` for chaining.
    pub fn add(&mut self, job: Job) -> Result<&mut Self> {
        job.validate()?;
        self.queue.push(job);
        Ok(self)
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Collect results (`true`, default) or detach after spawning (`false`) on later commits.
    pub fn set_wait(&mut self, wait: bool) -> &mut Self {
        self.opts.wait = wait;
        self
    }

    /// Change the batch size used by later commits.
    pub fn set_concurrency_limit(&mut self, limit: usize) -> Result<&mut Self> {
        options::validate_concurrency_limit(limit)?;
        self.opts.concurrency_limit = limit;
        Ok(self)
    }

    /// Run every queued job and drain the queue.
    ///
    /// Returns one entry per job keyed by submission index, or an empty map when the queue is
    /// empty or the controller does not wait (`wait == false`). Fails with
    /// `Error::Configuration`, leaving the queue intact, when no worker program is configured.
    pub async fn commit(&mut self) -> Result<Results> {
        if self.queue.is_empty() {
            return Ok(Results::new());
        }

        let program = self.worker_program()?;
        let queue = std::mem::take(&mut self.queue);
        let total = queue.len();
        let batches = planner::plan(queue, self.opts.concurrency_limit);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            jobs = total,
            batches = batches.len(),
            limit = self.opts.concurrency_limit,
            wait = self.opts.wait,
            "commit planned"
        );

        let mut results = Results::new();
        for batch in batches {
            let mut handles = Vec::with_capacity(batch.len());
            for launched in launcher::launch(&program, &self.opts, batch) {
                match launched {
                    launcher::Launched::Running(handle) => handles.push(handle),
                    launcher::Launched::Failed(entry) => {
                        results.insert(entry.index, entry);
                    }
                }
            }

            if !self.opts.wait {
                // Detached workers are reaped in the background by async-process.
                drop(handles);
                continue;
            }

            results.extend(collector::collect(handles, &self.opts).await);
        }

        if !self.opts.wait {
            return Ok(Results::new());
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            jobs = total,
            failed = results.values().filter(|e| !e.success).count(),
            "commit finished"
        );

        debug_assert_eq!(results.len(), total);
        Ok(results)
    }

    fn worker_program(&self) -> Result<PathBuf> {
        match &self.opts.worker_program {
            Some(program) => Ok(program.clone()),
            None => Err(Error::configuration(format!(
                "worker program is not configured (set ControllerOptions::worker_program or {WORKER_PROGRAM_ENV})"
            ))),
        }
    }
}
