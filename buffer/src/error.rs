//! Error types for buffer and worker operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Buffer operation error.
///
/// Full and empty buffers are not errors: `put` and `get` block instead.
/// Errors only come from construction or from a bounded wait running out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The requested capacity cannot hold a single element.
    #[error("buffer: invalid capacity {0}, must be greater than 0")]
    InvalidCapacity(usize),

    /// A bounded wait elapsed before the operation could complete.
    #[error("buffer: timed out after {0:?}")]
    Timeout(Duration),
}

/// Returned by [`put_timeout`] and [`try_put`] when the item could not be
/// inserted.
///
/// The rejected item is handed back so the caller can retry or drop it.
///
/// [`put_timeout`]: crate::BoundedBuffer::put_timeout
/// [`try_put`]: crate::BoundedBuffer::try_put
#[derive(Clone, PartialEq, Eq, Error)]
#[error("buffer: full, item not inserted")]
pub struct PutTimeoutError<T>(pub T);

impl<T> PutTimeoutError<T> {
    /// Returns the item that could not be inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl so that `T` does not need to be `Debug`.
impl<T> fmt::Debug for PutTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PutTimeoutError").finish_non_exhaustive()
    }
}

/// Returned by a [`Sink`](crate::Sink) that cannot take more items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The receiving end has gone away.
    #[error("sink: closed")]
    Closed,
}

/// Returned by [`Sink::accept`](crate::Sink::accept) when the item was
/// refused. The item is handed back so it is never silently lost.
#[derive(Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejected<T> {
    pub item: T,
    pub reason: SinkError,
}

impl<T> Rejected<T> {
    /// Splits the error into the refused item and the reason.
    pub fn into_parts(self) -> (T, SinkError) {
        (self.item, self.reason)
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Producer, consumer and task lifecycle errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The producer's source failed mid-stream.
    ///
    /// The end marker has still been emitted when this is returned.
    #[error("worker {name}: source failed: {source}")]
    Source {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The consumer's destination stopped accepting items.
    #[error("worker {name}: sink failed: {source}")]
    Sink {
        name: String,
        #[source]
        source: SinkError,
    },

    /// The task panicked.
    #[error("worker {name}: panicked: {message}")]
    Panicked { name: String, message: String },

    /// The task did not finish within the join deadline.
    #[error("worker {name}: still running after {timeout:?}")]
    JoinTimeout { name: String, timeout: Duration },

    /// The operating system refused to start the thread.
    #[error("worker {name}: failed to spawn: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
