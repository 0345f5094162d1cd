use crate::codec::serialize_payload;
use crate::planner::Batch;
use crate::{ControllerOptions, Job, JobFailure, ResultEntry, util};

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Flag telling the worker not to emit a result (fire-and-forget commits).
pub(crate) const NO_RESULT_FLAG: &str = "--no-result";

const SPAWN_DETAIL_MAX_BYTES: usize = 512;

/// Program and argv for one worker.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Invocation {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
}

impl Invocation {
    /// `<program> <worker_args..> --cmd <enc> [--data <enc>] [--pipe <enc>] [job args..] [--no-result]`
    pub(crate) fn build(program: &Path, opts: &ControllerOptions, job: &Job) -> Self {
        let mut args = opts.worker_args.clone();

        args.push("--cmd".to_string());
        args.push(opts.encoding.encode(&job.command));

        if let Some(data) = serialize_payload(job.data.as_ref()) {
            args.push("--data".to_string());
            args.push(opts.encoding.encode(&data));
        }

        if let Some(pipe) = serialize_payload(job.pipe.as_ref()) {
            args.push("--pipe".to_string());
            args.push(opts.encoding.encode(&pipe));
        }

        args.extend(job.args.iter().cloned());

        if !opts.wait {
            args.push(NO_RESULT_FLAG.to_string());
        }

        Self {
            program: program.to_path_buf(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program.to_string_lossy();
        let argv = std::iter::once(&*program).chain(self.args.iter().map(String::as_str));
        f.write_str(&util::quote_command_line(argv))
    }
}

/// Runtime record of a live worker.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub(crate) index: usize,
    pub(crate) command: String,
    pub(crate) child: async_process::Child,
}

#[derive(Debug)]
pub(crate) enum Launched {
    Running(WorkerHandle),
    Failed(ResultEntry),
}

/// Spawn every job of a batch. A job that fails to spawn becomes a failed entry; its
/// siblings are still launched.
pub(crate) fn launch(program: &Path, opts: &ControllerOptions, batch: Batch) -> Vec<Launched> {
    batch
        .jobs
        .into_iter()
        .map(|(index, job)| {
            let invocation = Invocation::build(program, opts, &job);
            match spawn(&invocation, opts.wait) {
                Ok(child) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        index,
                        command = %job.command,
                        pid = child.id(),
                        invocation = %invocation,
                        "worker spawned"
                    );

                    Launched::Running(WorkerHandle {
                        index,
                        command: job.command,
                        child,
                    })
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(index, command = %job.command, error = %e, "worker spawn failed");

                    let detail = format!("spawn {invocation}: {e}");
                    let detail = crate::error::truncate_for_error(&detail, SPAWN_DETAIL_MAX_BYTES);
                    Launched::Failed(ResultEntry::failed(
                        index,
                        job.command,
                        JobFailure::Spawn {
                            detail: detail.into_owned(),
                        },
                    ))
                }
            }
        })
        .collect()
}

fn spawn(invocation: &Invocation, wait: bool) -> std::io::Result<async_process::Child> {
    let mut cmd = async_process::Command::new(&invocation.program);
    cmd.args(&invocation.args).stdin(Stdio::piped());

    if wait {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    cmd.spawn()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::ArgEncoding;

    fn plain_opts() -> ControllerOptions {
        ControllerOptions {
            worker_args: vec!["/srv/app/api.php".to_string()],
            encoding: ArgEncoding::Plain,
            ..Default::default()
        }
    }

    #[test]
    fn invocation_orders_flags() {
        let job = Job::new("user/login")
            .with_data(serde_json::json!({"id": 1}))
            .with_pipe(serde_json::json!(["x"]))
            .with_args(["--trace", "7"]);
        let inv = Invocation::build(Path::new("/usr/bin/php"), &plain_opts(), &job);

        assert_eq!(inv.program, PathBuf::from("/usr/bin/php"));
        assert_eq!(
            inv.args,
            vec![
                "/srv/app/api.php",
                "--cmd",
                "user/login",
                "--data",
                r#"{"id":1}"#,
                "--pipe",
                r#"["x"]"#,
                "--trace",
                "7",
            ]
        );
    }

    #[test]
    fn empty_payloads_are_omitted() {
        let job = Job::new("a").with_data(serde_json::json!({}));
        let inv = Invocation::build(Path::new("w"), &plain_opts(), &job);
        assert_eq!(inv.args, vec!["/srv/app/api.php", "--cmd", "a"]);
    }

    #[test]
    fn no_result_flag_only_without_wait() {
        let job = Job::new("a").with_args(["tail"]);
        let mut opts = plain_opts();
        opts.wait = false;
        let inv = Invocation::build(Path::new("w"), &opts, &job);
        assert_eq!(inv.args.last().map(String::as_str), Some(NO_RESULT_FLAG));
        assert_eq!(inv.args[inv.args.len() - 2], "tail");

        opts.wait = true;
        let inv = Invocation::build(Path::new("w"), &opts, &job);
        assert!(!inv.args.iter().any(|a| a == NO_RESULT_FLAG));
    }

    #[test]
    fn encoded_command_is_base64url_by_default() {
        let opts = ControllerOptions::default();
        let inv = Invocation::build(Path::new("w"), &opts, &Job::new("a/b"));
        assert_eq!(inv.args, vec!["--cmd", "YS9i"]);
    }

    #[test]
    fn display_quotes_for_logging() {
        let inv = Invocation {
            program: PathBuf::from("/opt/my worker"),
            args: vec!["--cmd".to_string(), "a b".to_string()],
        };
        assert_eq!(inv.to_string(), "'/opt/my worker' --cmd 'a b'");
    }

    #[test]
    fn spawn_failure_is_isolated_per_job() {
        let batch = Batch {
            jobs: vec![(4, Job::new("a")), (5, Job::new("b"))],
        };
        let launched = launch(
            Path::new("/nonexistent/mpctl-worker"),
            &ControllerOptions::default(),
            batch,
        );
        assert_eq!(launched.len(), 2);
        for (l, expected) in launched.iter().zip([4usize, 5]) {
            let Launched::Failed(entry) = l else {
                panic!("unexpected launch: {l:?}");
            };
            assert_eq!(entry.index, expected);
            assert!(!entry.success);
            assert!(matches!(entry.failure, Some(JobFailure::Spawn { .. })));
        }
    }
}
