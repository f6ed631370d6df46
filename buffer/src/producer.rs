//! Producer task: feeds a finite source into a shared buffer.

use std::error::Error;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bounded_buffer::BoundedBuffer;
use crate::error::WorkerError;
use crate::message::Message;
use crate::worker::Worker;

type BoxError = Box<dyn Error + Send + Sync>;
type Source<T> = Box<dyn Iterator<Item = Result<T, BoxError>> + Send>;

/// Pushes an ordered sequence of items into a buffer, then exactly one
/// [`Message::End`].
///
/// The end marker is sent on every exit path: after the last item, after a
/// source error, and while unwinding from a panic. Consumers therefore never
/// wait forever on a producer that went away.
///
/// # Example
///
/// ```
/// use boundq_buffer::{BoundedBuffer, Message, Producer};
///
/// let buf = BoundedBuffer::new(4).unwrap();
/// let report = Producer::new(vec![1, 2], buf.clone()).run().unwrap();
///
/// assert_eq!(report.produced, 2);
/// assert_eq!(buf.to_vec(), vec![Message::Item(1), Message::Item(2), Message::End]);
/// ```
pub struct Producer<T> {
    name: String,
    source: Source<T>,
    buffer: BoundedBuffer<Message<T>>,
    delay: Option<Duration>,
}

/// Summary returned by a finished producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub name: String,
    pub produced: usize,
}

impl<T: Send + 'static> Producer<T> {
    /// Creates a producer over an infallible source.
    pub fn new<I>(source: I, buffer: BoundedBuffer<Message<T>>) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_source(Box::new(source.into_iter().map(Ok)), buffer)
    }

    /// Creates a producer over a source that may fail mid-stream.
    ///
    /// The first error stops production; [`run`](Self::run) returns it as
    /// [`WorkerError::Source`] after the end marker has been sent.
    pub fn from_results<I, E>(source: I, buffer: BoundedBuffer<Message<T>>) -> Self
    where
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: Send + 'static,
        E: Error + Send + Sync + 'static,
    {
        let source = source
            .into_iter()
            .map(|next| next.map_err(|e| Box::new(e) as BoxError));
        Self::from_source(Box::new(source), buffer)
    }

    fn from_source(source: Source<T>, buffer: BoundedBuffer<Message<T>>) -> Self {
        Producer {
            name: "producer".to_string(),
            source,
            buffer,
            delay: None,
        }
    }

    /// Sets the thread name used by [`spawn`](Self::spawn) and in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleeps for `delay` before each item, simulating per-item work.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Produces every item on the current thread.
    pub fn run(self) -> Result<ProducerReport, WorkerError> {
        let Producer {
            name,
            source,
            buffer,
            delay,
        } = self;
        info!(worker = %name, "producer started");

        let end = EndOnDrop(buffer.clone());
        let mut produced = 0;
        for next in source {
            let item = match next {
                Ok(item) => item,
                Err(source) => {
                    warn!(worker = %name, produced, error = %source, "producer source failed");
                    drop(end);
                    return Err(WorkerError::Source { name, source });
                }
            };
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            buffer.put(Message::Item(item));
            produced += 1;
            debug!(worker = %name, produced, "produced item");
        }

        drop(end);
        info!(worker = %name, produced, "producer finished");
        Ok(ProducerReport { name, produced })
    }

    /// Starts [`run`](Self::run) on a new named thread.
    pub fn spawn(self) -> Result<Worker<ProducerReport>, WorkerError> {
        Worker::spawn(self.name.clone(), move || self.run())
    }
}

/// Puts the end marker when dropped.
struct EndOnDrop<T>(BoundedBuffer<Message<T>>);

impl<T> Drop for EndOnDrop<T> {
    fn drop(&mut self) {
        self.0.put(Message::End);
    }
}
