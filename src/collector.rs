use crate::launcher::WorkerHandle;
use crate::runtime::BoxFuture;
use crate::{ControllerOptions, JobFailure, ResultData, ResultEntry, util};

use futures_lite::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use futures_util::FutureExt;
use futures_util::StreamExt;
use futures_util::future::Fuse;
use futures_util::stream::FuturesUnordered;

use std::collections::BTreeMap;
use std::time::Duration;

/// Drain every live worker of a batch and return one entry per handle.
///
/// Each worker gets its own monitor future; all monitors are polled together on the calling
/// task, so a slow worker never delays noticing that another one has finished.
pub(crate) async fn collect(
    handles: Vec<WorkerHandle>,
    opts: &ControllerOptions,
) -> BTreeMap<usize, ResultEntry> {
    let mut monitors: FuturesUnordered<_> = handles
        .into_iter()
        .map(|handle| monitor(handle, opts))
        .collect();

    let mut results = BTreeMap::new();
    while let Some(entry) = monitors.next().await {
        results.insert(entry.index, entry);
    }
    results
}

#[derive(Debug, Eq, PartialEq)]
enum StreamEnd {
    Eof,
    ReadFailed(String),
    TimedOut,
}

async fn monitor(handle: WorkerHandle, opts: &ControllerOptions) -> ResultEntry {
    let WorkerHandle {
        index,
        command,
        mut child,
    } = handle;

    // Nothing is ever written to the worker.
    drop(child.stdin.take());

    let mut stderr = child.stderr.take();
    let mut stderr_buf = Vec::<u8>::new();
    let mut output = Vec::<u8>::new();

    let mut deadline = crate::runtime::deadline(opts.deadline).fuse();

    let mut end = match child.stdout.take() {
        Some(stdout) => {
            pump(
                &mut BufReader::new(stdout),
                &mut stderr,
                &mut stderr_buf,
                &mut output,
                &mut deadline,
                opts,
            )
            .await
        }
        None => StreamEnd::ReadFailed("worker stdout not captured".to_string()),
    };

    let mut exit_code = None;
    if matches!(end, StreamEnd::Eof) {
        let finished = futures_util::select! {
            _ = deadline => None,
            status = finish(&mut child, &mut stderr, &mut stderr_buf, opts.stderr_max_bytes).fuse() => Some(status),
        };
        match finished {
            Some(Ok(status)) => exit_code = status.code(),
            Some(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(index, command = %command, error = %_e, "wait worker failed");
            }
            None => end = StreamEnd::TimedOut,
        }
    }

    if !matches!(end, StreamEnd::Eof) {
        let _ = child.kill();
        let _ = child.status().await;
    }

    let output = String::from_utf8_lossy(&output).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_buf).into_owned();

    let failure = match end {
        StreamEnd::Eof => None,
        StreamEnd::ReadFailed(detail) => Some(JobFailure::Read { detail }),
        StreamEnd::TimedOut => Some(JobFailure::TimedOut {
            timeout: opts.deadline.unwrap_or(Duration::ZERO),
        }),
    };

    #[cfg(feature = "tracing")]
    match &failure {
        None => tracing::debug!(
            index,
            command = %command,
            exit_code,
            output_bytes = output.len(),
            stderr_bytes = stderr.len(),
            "worker finished"
        ),
        Some(failure) => tracing::warn!(index, command = %command, ?failure, "worker failed"),
    }

    ResultEntry {
        index,
        success: failure.is_none(),
        command,
        data: ResultData::decode(output),
        stderr,
        exit_code,
        failure,
    }
}

/// Read stdout into `output` until end-of-stream, a read error or the deadline, capturing
/// stderr alongside. Output read before a failure is kept.
async fn pump<O, E>(
    stdout: &mut O,
    stderr: &mut Option<E>,
    stderr_buf: &mut Vec<u8>,
    output: &mut Vec<u8>,
    mut deadline: &mut Fuse<BoxFuture<()>>,
    opts: &ControllerOptions,
) -> StreamEnd
where
    O: AsyncBufRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut line = Vec::<u8>::new();
    let mut stderr_tmp = [0u8; 1024];

    loop {
        let n = if let Some(s) = stderr.as_mut() {
            futures_util::select! {
                _ = deadline => return StreamEnd::TimedOut,
                n = s.read(&mut stderr_tmp).fuse() => {
                    match n {
                        Ok(0) | Err(_) => *stderr = None,
                        Ok(n) => util::push_limited(stderr_buf, &stderr_tmp[..n], opts.stderr_max_bytes),
                    }
                    continue;
                }
                n = read_line_bounded(stdout, &mut line, opts.max_line_bytes).fuse() => n,
            }
        } else {
            futures_util::select! {
                _ = deadline => return StreamEnd::TimedOut,
                n = read_line_bounded(stdout, &mut line, opts.max_line_bytes).fuse() => n,
            }
        };

        match n {
            Ok(0) => return StreamEnd::Eof,
            Ok(_) => {
                output.extend_from_slice(line.trim_ascii_end());
                line.clear();
            }
            Err(e) => {
                output.extend_from_slice(line.trim_ascii_end());
                return StreamEnd::ReadFailed(e.to_string());
            }
        }
    }
}

/// Drain stderr to end-of-stream and reap the worker.
async fn finish<E>(
    child: &mut async_process::Child,
    stderr: &mut Option<E>,
    stderr_buf: &mut Vec<u8>,
    cap: usize,
) -> std::io::Result<std::process::ExitStatus>
where
    E: AsyncRead + Unpin,
{
    if let Some(s) = stderr {
        let _ = drain_to_end_limited(s, stderr_buf, cap).await;
    }
    child.status().await
}

/// Read up to `max` bytes or through the next newline, whichever comes first.
///
/// Bytes left in `line` by a cancelled call count toward `max`. Returns 0 only at
/// end-of-stream with nothing pending.
async fn read_line_bounded<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let remaining = max.saturating_sub(line.len());
    if remaining == 0 {
        return Ok(line.len());
    }
    let limit = u64::try_from(remaining).unwrap_or(u64::MAX);
    let n = AsyncReadExt::take(&mut *reader, limit)
        .read_until(b'\n', line)
        .await?;
    if n == 0 {
        return Ok(line.len());
    }
    Ok(n)
}

async fn drain_to_end_limited<E>(stderr: &mut E, out: &mut Vec<u8>, cap: usize) -> std::io::Result<()>
where
    E: AsyncRead + Unpin,
{
    let mut tmp = [0u8; 1024];
    loop {
        let n = stderr.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        util::push_limited(out, &tmp[..n], cap);
    }
}
