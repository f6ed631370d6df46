//! Bounded blocking buffer with producer/consumer workers.
//!
//! This crate coordinates producer threads with consumer threads through a
//! single fixed-capacity queue:
//!
//! - [`BoundedBuffer<T>`]: a FIFO that blocks `put` when full and `get` when
//!   empty, guarded by one mutex and two condition variables
//! - [`Producer`]: pushes a finite source, then one end-of-stream marker
//! - [`Consumer`]: drains items into a [`Sink`] until it sees the marker
//! - [`Worker`]: the thread handle both of them run on
//!
//! # End of stream
//!
//! Workers exchange [`Message<T>`] values. A producer always finishes with a
//! single [`Message::End`], even when its source fails. A consumer that
//! receives it puts it straight back before stopping, so one marker is
//! enough to stop any number of consumers sharing the buffer.
//!
//! ```
//! use boundq_buffer::{BoundedBuffer, Consumer, Producer};
//! use std::time::Duration;
//!
//! let buf = BoundedBuffer::new(3).unwrap();
//!
//! let producer = Producer::new(1..=100, buf.clone()).spawn().unwrap();
//! let consumer = Consumer::new(buf.clone(), Vec::new()).spawn().unwrap();
//!
//! producer.join_timeout(Duration::from_secs(5)).unwrap();
//! let report = consumer.join_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(report.into_sink(), (1..=100).collect::<Vec<_>>());
//! ```
//!
//! # Thread Safety
//!
//! [`BoundedBuffer`] is `Send + Sync` and is shared between threads using
//! `Clone` (which shares the underlying buffer via `Arc`).

mod bounded_buffer;
mod consumer;
mod error;
mod message;
mod producer;
mod sink;
mod worker;

pub use bounded_buffer::BoundedBuffer;
pub use consumer::{Consumer, ConsumerReport, ConsumerState};
pub use error::{BufferError, PutTimeoutError, Rejected, SinkError, WorkerError};
pub use message::Message;
pub use producer::{Producer, ProducerReport};
pub use sink::Sink;
pub use worker::Worker;
