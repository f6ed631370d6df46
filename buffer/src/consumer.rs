//! Consumer task: drains a shared buffer until end-of-stream.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bounded_buffer::BoundedBuffer;
use crate::error::WorkerError;
use crate::message::Message;
use crate::sink::Sink;
use crate::worker::Worker;

/// Lifecycle of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Pulling items and delivering them to the sink.
    Running,
    /// End marker received, passing it on for sibling consumers.
    Propagating,
    /// Done. Terminal.
    Stopped,
}

/// Pulls items from a buffer into a [`Sink`] until it sees
/// [`Message::End`].
///
/// The end marker is put back before the consumer stops, so every consumer
/// sharing the buffer observes it once, one after another.
pub struct Consumer<T, S> {
    name: String,
    buffer: BoundedBuffer<Message<T>>,
    sink: S,
    delay: Option<Duration>,
    state: ConsumerState,
}

/// Summary returned by a finished consumer.
#[derive(Debug)]
pub struct ConsumerReport<T, S> {
    pub name: String,
    /// Items the sink accepted.
    pub consumed: usize,
    pub state: ConsumerState,
    pub sink: S,
    /// Items taken from the buffer after the sink failed, the refused one
    /// first.
    pub undelivered: Vec<T>,
    /// Why the sink stopped accepting items, if it did.
    pub sink_error: Option<WorkerError>,
}

impl<T, S> ConsumerReport<T, S> {
    /// Returns the destination the items were delivered to.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Returns true if every item taken was delivered.
    pub fn is_complete(&self) -> bool {
        self.sink_error.is_none()
    }
}

impl<T, S> Consumer<T, S>
where
    T: Send + 'static,
    S: Sink<T> + Send + 'static,
{
    pub fn new(buffer: BoundedBuffer<Message<T>>, sink: S) -> Self {
        Consumer {
            name: "consumer".to_string(),
            buffer,
            sink,
            delay: None,
            state: ConsumerState::Running,
        }
    }

    /// Sets the thread name used by [`spawn`](Self::spawn) and in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleeps for `delay` after taking each item, simulating per-item work.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Consumes items on the current thread until end-of-stream.
    ///
    /// A sink failure does not stop the consumer early: it keeps taking items
    /// until the end marker so producers never block on a buffer nobody
    /// drains. Items it could not deliver are returned in
    /// [`ConsumerReport::undelivered`] together with the sink error.
    pub fn run(mut self) -> Result<ConsumerReport<T, S>, WorkerError> {
        info!(worker = %self.name, "consumer started");

        let mut consumed = 0;
        let mut undelivered = Vec::new();
        let mut sink_error = None;
        while self.state == ConsumerState::Running {
            match self.buffer.get() {
                Message::Item(item) if sink_error.is_some() => undelivered.push(item),
                Message::Item(item) => {
                    if let Some(delay) = self.delay {
                        thread::sleep(delay);
                    }
                    match self.sink.accept(item) {
                        Ok(()) => {
                            consumed += 1;
                            debug!(worker = %self.name, consumed, "consumed item");
                        }
                        Err(rejected) => {
                            let (item, reason) = rejected.into_parts();
                            warn!(worker = %self.name, consumed, error = %reason, "consumer sink failed, draining");
                            undelivered.push(item);
                            sink_error = Some(WorkerError::Sink {
                                name: self.name.clone(),
                                source: reason,
                            });
                        }
                    }
                }
                Message::End => {
                    self.advance(ConsumerState::Propagating);
                    self.buffer.put(Message::End);
                    self.advance(ConsumerState::Stopped);
                }
            }
        }

        if undelivered.is_empty() {
            info!(worker = %self.name, consumed, "consumer finished");
        } else {
            warn!(worker = %self.name, consumed, undelivered = undelivered.len(), "consumer finished with undelivered items");
        }
        Ok(ConsumerReport {
            name: self.name,
            consumed,
            state: self.state,
            sink: self.sink,
            undelivered,
            sink_error,
        })
    }

    /// Starts [`run`](Self::run) on a new named thread.
    pub fn spawn(self) -> Result<Worker<ConsumerReport<T, S>>, WorkerError> {
        Worker::spawn(self.name.clone(), move || self.run())
    }

    fn advance(&mut self, next: ConsumerState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (ConsumerState::Running, ConsumerState::Propagating)
                    | (ConsumerState::Propagating, ConsumerState::Stopped)
            ),
            "illegal consumer transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(worker = %self.name, from = ?self.state, to = ?next, "consumer state");
        self.state = next;
    }
}
