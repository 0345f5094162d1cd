use crate::Job;

/// A contiguous slice of the queue. Jobs keep their submission index so results from
/// different batches merge without collisions.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Batch {
    pub(crate) jobs: Vec<(usize, Job)>,
}

impl Batch {
    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }
}

/// Split the queue into consecutive batches of at most `limit` jobs.
///
/// `limit` must be non-zero (enforced by `ControllerOptions::validate`). An empty queue yields
/// no batches.
pub(crate) fn plan(queue: Vec<Job>, limit: usize) -> Vec<Batch> {
    let limit = limit.max(1);
    let mut batches: Vec<Batch> = Vec::with_capacity(queue.len().div_ceil(limit));
    for (index, job) in queue.into_iter().enumerate() {
        match batches.last_mut() {
            Some(batch) if batch.len() < limit => batch.jobs.push((index, job)),
            _ => batches.push(Batch {
                jobs: vec![(index, job)],
            }),
        }
    }
    batches
}
