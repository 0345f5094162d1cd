use crate::{Controller, ControllerOptions, Job, Result, Results};

/// Blocking wrapper for `Controller` (feature=`blocking`).
///
/// Internally it uses the selected runtime (`rt-async-io` or `rt-tokio`) to drive the async
/// implementation. Only `commit` blocks; queueing is synchronous either way.
#[derive(Debug)]
pub struct BlockingController {
    inner: Controller,
}

impl BlockingController {
    pub fn new(opts: ControllerOptions) -> Result<Self> {
        Ok(Self {
            inner: Controller::new(opts)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            inner: Controller::from_env()?,
        })
    }

    pub fn options(&self) -> &ControllerOptions {
        self.inner.options()
    }

    pub fn add(&mut self, job: Job) -> Result<&mut Self> {
        self.inner.add(job)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn set_wait(&mut self, wait: bool) -> &mut Self {
        self.inner.set_wait(wait);
        self
    }

    pub fn set_concurrency_limit(&mut self, limit: usize) -> Result<&mut Self> {
        self.inner.set_concurrency_limit(limit)?;
        Ok(self)
    }

    /// Run every queued job (blocking). See `Controller::commit`.
    pub fn commit(&mut self) -> Result<Results> {
        crate::runtime::run_to_completion(self.inner.commit())?
    }

    /// Unwrap into the async controller.
    pub fn into_inner(self) -> Controller {
        self.inner
    }
}

impl From<Controller> for BlockingController {
    fn from(inner: Controller) -> Self {
        Self { inner }
    }
}
