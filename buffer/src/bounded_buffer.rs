//! Fixed-capacity blocking FIFO buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{BufferError, PutTimeoutError};

/// A thread-safe fixed-capacity FIFO buffer.
///
/// `put` blocks while the buffer is full and `get` blocks while it is empty.
/// Any number of producers and consumers may share one buffer: clones are
/// cheap handles onto the same underlying storage.
///
/// # Semantics
///
/// - **Put**: Blocks when full, appends to the tail when space is available
/// - **Get**: Blocks when empty, removes from the head when data is available
/// - **Timeouts**: `put_timeout` / `get_timeout` give up after a deadline and
///   leave the buffer untouched
///
/// # Example
///
/// ```
/// use boundq_buffer::BoundedBuffer;
/// use std::thread;
///
/// let buf = BoundedBuffer::<i32>::new(2).unwrap();
/// let producer_buf = buf.clone();
///
/// // Blocks whenever two items are waiting
/// let producer = thread::spawn(move || {
///     for i in 0..10 {
///         producer_buf.put(i);
///     }
/// });
///
/// let items: Vec<i32> = (0..10).map(|_| buf.get()).collect();
/// producer.join().unwrap();
/// assert_eq!(items, (0..10).collect::<Vec<_>>());
/// ```
pub struct BoundedBuffer<T> {
    inner: Arc<BoundedBufferInner<T>>,
}

struct BoundedBufferInner<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        BoundedBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedBuffer<T> {
    /// Creates a new buffer holding at most `capacity` elements.
    ///
    /// Returns [`BufferError::InvalidCapacity`] when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }

        Ok(BoundedBuffer {
            inner: Arc::new(BoundedBufferInner {
                items: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        })
    }

    /// Returns the maximum number of elements the buffer holds.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the number of elements currently in the buffer.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.len() >= self.inner.capacity
    }

    /// Appends an item to the tail of the buffer.
    ///
    /// Blocks while the buffer is full. There is no failure mode: a caller
    /// that needs to bound the wait should use [`put_timeout`](Self::put_timeout).
    pub fn put(&self, item: T) {
        let mut items = self.lock();
        while items.len() >= self.inner.capacity {
            trace!(capacity = self.inner.capacity, "buffer: full, waiting for space");
            items = self
                .inner
                .not_full
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }

        items.push_back(item);
        self.inner.not_empty.notify_one();
    }

    /// Removes and returns the head of the buffer.
    ///
    /// Blocks while the buffer is empty.
    pub fn get(&self) -> T {
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.inner.not_full.notify_one();
                return item;
            }
            trace!("buffer: empty, waiting for data");
            items = self
                .inner
                .not_empty
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`put`](Self::put), but gives up once `timeout` has elapsed.
    ///
    /// On timeout the item is returned inside the error and the buffer is
    /// left exactly as it was.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutTimeoutError<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.put(item);
            return Ok(());
        };
        let mut items = self.lock();

        // The predicate is checked before the deadline so that a wakeup
        // racing with the timeout still uses the freed slot.
        while items.len() >= self.inner.capacity {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PutTimeoutError(item));
            }
            let (guard, _) = self
                .inner
                .not_full
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }

        items.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Like [`get`](Self::get), but gives up once `timeout` has elapsed.
    ///
    /// Returns [`BufferError::Timeout`] if no element arrived in time.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, BufferError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.get());
        };
        let mut items = self.lock();

        loop {
            if let Some(item) = items.pop_front() {
                self.inner.not_full.notify_one();
                return Ok(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BufferError::Timeout(timeout));
            }
            let (guard, _) = self
                .inner
                .not_empty
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
    }

    /// Appends an item only if there is room right now.
    pub fn try_put(&self, item: T) -> Result<(), PutTimeoutError<T>> {
        let mut items = self.lock();
        if items.len() >= self.inner.capacity {
            return Err(PutTimeoutError(item));
        }
        items.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head only if an element is available right now.
    pub fn try_get(&self) -> Option<T> {
        let mut items = self.lock();
        let item = items.pop_front()?;
        self.inner.not_full.notify_one();
        Some(item)
    }

    // No operation panics between mutations of `items`, so the queue is
    // consistent even when another thread panicked while holding the lock.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> BoundedBuffer<T> {
    /// Returns a copy of all elements in the buffer, head first.
    pub fn to_vec(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            BoundedBuffer::<i32>::new(0).err(),
            Some(BufferError::InvalidCapacity(0))
        );
    }

    #[test]
    fn test_put_get_fifo() {
        let buf = BoundedBuffer::<i32>::new(4).unwrap();
        buf.put(1);
        buf.put(2);
        buf.put(3);

        assert_eq!(buf.get(), 1);
        assert_eq!(buf.get(), 2);
        assert_eq!(buf.get(), 3);
    }

    #[test]
    fn test_capacity_and_len() {
        let buf = BoundedBuffer::<i32>::new(3).unwrap();
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert!(!buf.is_full());

        for i in 0..3 {
            buf.put(i);
        }
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_empty());
        assert!(buf.is_full());
    }

    #[test]
    fn test_to_vec() {
        let buf = BoundedBuffer::<i32>::new(4).unwrap();
        buf.put(1);
        buf.put(2);
        buf.put(3);
        assert_eq!(buf.get(), 1);
        buf.put(4);

        assert_eq!(buf.to_vec(), vec![2, 3, 4]);
        // Snapshot does not consume
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_blocking_get_on_empty() {
        let buf = BoundedBuffer::<i32>::new(1).unwrap();
        let reader_buf = buf.clone();

        let reader = thread::spawn(move || reader_buf.get());

        // Give the reader time to block
        thread::sleep(Duration::from_millis(100));
        assert!(!reader.is_finished());

        buf.put(99);
        assert_eq!(reader.join().unwrap(), 99);
    }

    #[test]
    fn test_blocking_put_on_full() {
        let buf = BoundedBuffer::<i32>::new(1).unwrap();
        buf.put(1);

        let writer_buf = buf.clone();
        let done = Arc::new(AtomicBool::new(false));
        let writer_done = Arc::clone(&done);
        let writer = thread::spawn(move || {
            writer_buf.put(2);
            writer_done.store(true, Ordering::SeqCst);
        });

        // Give the writer time to block
        thread::sleep(Duration::from_millis(100));
        assert!(!done.load(Ordering::SeqCst));
        assert_eq!(buf.len(), 1);

        assert_eq!(buf.get(), 1);
        writer.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(buf.get(), 2);
    }

    #[test]
    fn test_put_timeout_on_full_returns_item() {
        let buf = BoundedBuffer::<String>::new(1).unwrap();
        buf.put("first".to_string());

        let err = buf
            .put_timeout("second".to_string(), Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err.into_inner(), "second");

        // Buffer untouched by the failed put
        assert_eq!(buf.to_vec(), vec!["first".to_string()]);
    }

    #[test]
    fn test_put_timeout_succeeds_after_get() {
        let buf = BoundedBuffer::<i32>::new(1).unwrap();
        buf.put(1);

        let reader_buf = buf.clone();
        let reader = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            reader_buf.get()
        });

        buf.put_timeout(2, Duration::from_secs(5)).unwrap();
        assert_eq!(reader.join().unwrap(), 1);
        assert_eq!(buf.get(), 2);
    }

    #[test]
    fn test_get_timeout_on_empty() {
        let buf = BoundedBuffer::<i32>::new(2).unwrap();
        let timeout = Duration::from_millis(20);
        assert_eq!(buf.get_timeout(timeout), Err(BufferError::Timeout(timeout)));
        assert!(buf.is_empty());

        buf.put(7);
        assert_eq!(buf.get_timeout(timeout), Ok(7));
    }

    #[test]
    fn test_try_put_try_get() {
        let buf = BoundedBuffer::<i32>::new(1).unwrap();
        assert_eq!(buf.try_get(), None);

        buf.try_put(1).unwrap();
        assert_eq!(buf.try_put(2).unwrap_err().into_inner(), 2);

        assert_eq!(buf.try_get(), Some(1));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let buf = BoundedBuffer::<usize>::new(3).unwrap();
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let buf = buf.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        buf.put(p * 1000 + i);
                        assert!(buf.len() <= 3);
                    }
                })
            })
            .collect();

        let mut count = 0;
        while count < 800 {
            assert!(buf.len() <= buf.capacity());
            buf.get();
            count += 1;
        }

        for p in producers {
            p.join().unwrap();
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let buf = BoundedBuffer::<i32>::new(2).unwrap();
        buf.put(1);

        let poison_buf = buf.clone();
        let _ = thread::spawn(move || {
            let _guard = poison_buf.lock();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(buf.get(), 1);
        buf.put(2);
        assert_eq!(buf.get(), 2);
    }
}
