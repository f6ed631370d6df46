//! Destinations for consumed items.

use std::sync::mpsc::{SendError, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Rejected, SinkError};

/// Where a [`Consumer`](crate::Consumer) delivers items, in arrival order.
pub trait Sink<T> {
    /// Accepts one item, or hands it back inside [`Rejected`].
    fn accept(&mut self, item: T) -> Result<(), Rejected<T>>;
}

impl<T> Sink<T> for Vec<T> {
    fn accept(&mut self, item: T) -> Result<(), Rejected<T>> {
        self.push(item);
        Ok(())
    }
}

/// Forwards items to a channel. Fails once the receiver is dropped.
impl<T> Sink<T> for Sender<T> {
    fn accept(&mut self, item: T) -> Result<(), Rejected<T>> {
        self.send(item).map_err(|SendError(item)| Rejected {
            item,
            reason: SinkError::Closed,
        })
    }
}

/// A collector shared between several consumers.
impl<T> Sink<T> for Arc<Mutex<Vec<T>>> {
    fn accept(&mut self, item: T) -> Result<(), Rejected<T>> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
        Ok(())
    }
}
