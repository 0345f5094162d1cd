use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Resolves once `timeout` has elapsed on the selected runtime's timer, or never when there is
/// no timeout.
pub(crate) fn deadline(timeout: Option<Duration>) -> BoxFuture<()> {
    let Some(timeout) = timeout else {
        return Box::pin(futures_lite::future::pending());
    };

    #[cfg(feature = "rt-async-io")]
    return Box::pin(async move {
        async_io::Timer::after(timeout).await;
    });

    #[cfg(feature = "rt-tokio")]
    return Box::pin(tokio::time::sleep(timeout));
}

/// Drive `commit` to completion on the calling thread.
#[cfg(feature = "blocking")]
pub(crate) fn run_to_completion<F: Future>(commit: F) -> crate::Result<F::Output> {
    #[cfg(feature = "rt-async-io")]
    return Ok(async_io::block_on(commit));

    #[cfg(feature = "rt-tokio")]
    return tokio_rt::run(commit);
}

#[cfg(all(feature = "blocking", feature = "rt-tokio"))]
mod tokio_rt {
    use crate::{Error, Result};

    use std::future::Future;
    use std::sync::OnceLock;
    use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

    /// Runtime shared by every `BlockingController` called from plain threads.
    fn shared() -> Result<&'static Runtime> {
        static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();
        RUNTIME
            .get_or_init(|| {
                Builder::new_multi_thread()
                    .thread_name("mpctl-io")
                    .enable_all()
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|detail| Error::IoError {
                context: format!("start tokio runtime for blocking commit: {detail}"),
            })
    }

    pub(super) fn run<F: Future>(commit: F) -> Result<F::Output> {
        let Ok(handle) = Handle::try_current() else {
            return Ok(shared()?.block_on(commit));
        };
        if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
            return Err(Error::configuration(
                "BlockingController::commit inside async code needs a multi-thread tokio runtime; await Controller::commit instead",
            ));
        }
        Ok(tokio::task::block_in_place(|| handle.block_on(commit)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    use futures_util::FutureExt;

    #[test]
    fn unbounded_deadline_never_fires() {
        let fired = deadline(None).now_or_never();
        assert!(fired.is_none());
    }

    #[cfg(feature = "rt-async-io")]
    #[test]
    fn bounded_deadline_fires() {
        let started = std::time::Instant::now();
        async_io::block_on(deadline(Some(Duration::from_millis(20))));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[cfg(feature = "rt-tokio")]
    #[test]
    fn bounded_deadline_fires() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let started = std::time::Instant::now();
        rt.block_on(deadline(Some(Duration::from_millis(20))));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[cfg(feature = "blocking")]
    #[test]
    fn run_to_completion_outside_any_runtime() {
        assert_eq!(run_to_completion(async { 7 }).unwrap(), 7);
    }

    #[cfg(all(feature = "blocking", feature = "rt-tokio"))]
    #[test]
    fn run_to_completion_refuses_current_thread_runtime() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt
            .block_on(async { run_to_completion(async {}) })
            .expect_err("must fail");
        let crate::Error::Configuration { .. } = err else {
            panic!("unexpected error: {err:?}");
        };
    }
}
