/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by mpctl APIs.
///
/// Only failures that abort a whole call are errors. A worker that fails to spawn, breaks its
/// pipe or runs past its deadline is reported per job through
/// [`ResultEntry::failure`](crate::ResultEntry) instead, so sibling jobs are never affected.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input validation failure (e.g. a job without a command, a zero concurrency limit).
    #[error("invalid input: {context}")]
    InvalidInput { context: String },

    /// The controller is missing configuration it needs before any worker can start.
    #[error("configuration error: {detail}")]
    Configuration { detail: String },

    /// Generic I/O or runtime error with context.
    #[error("io error: {context}")]
    IoError { context: String },
}

impl Error {
    pub(crate) fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    pub(crate) fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration {
            detail: detail.into(),
        }
    }
}

pub(crate) fn truncate_for_error(input: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if input.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(input);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(input[..end].to_string())
}
