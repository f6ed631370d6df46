//! Named worker threads with bounded joins.

use std::any::Any;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::WorkerError;

/// Handle to a task running on its own thread.
///
/// Unlike a bare [`JoinHandle`], a `Worker` can be waited on with a
/// deadline, which is how a driver detects a task that never terminates.
pub struct Worker<R> {
    name: String,
    handle: JoinHandle<Result<R, WorkerError>>,
    completion: Arc<Completion>,
}

#[derive(Default)]
struct Completion {
    finished: Mutex<bool>,
    notify: Condvar,
}

/// Marks the task finished when dropped, so unwinding counts too.
struct CompletionGuard(Arc<Completion>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut finished = self
            .0
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *finished = true;
        self.0.notify.notify_all();
    }
}

impl<R: Send + 'static> Worker<R> {
    /// Starts `task` on a new thread called `name`.
    pub fn spawn<F>(name: impl Into<String>, task: F) -> Result<Self, WorkerError>
    where
        F: FnOnce() -> Result<R, WorkerError> + Send + 'static,
    {
        let name = name.into();
        let completion = Arc::new(Completion::default());
        let guard = CompletionGuard(Arc::clone(&completion));

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _guard = guard;
                task()
            })
            .map_err(|source| WorkerError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Worker {
            name,
            handle,
            completion,
        })
    }
}

impl<R> Worker<R> {
    /// Returns the thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while the task has not returned.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Waits up to `timeout` for the task to finish.
    ///
    /// Returns true if the task finished in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let finished = self
            .completion
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (finished, _) = self
            .completion
            .notify
            .wait_timeout_while(finished, timeout, |finished| !*finished)
            .unwrap_or_else(PoisonError::into_inner);
        *finished
    }

    /// Blocks until the task finishes and returns its result.
    ///
    /// A panic inside the task is reported as [`WorkerError::Panicked`].
    pub fn join(self) -> Result<R, WorkerError> {
        let name = self.name;
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => Err(WorkerError::Panicked {
                message: panic_message(payload.as_ref()),
                name,
            }),
        }
    }

    /// Like [`join`](Self::join), but gives up after `timeout`.
    ///
    /// On timeout the thread is detached and keeps running.
    pub fn join_timeout(self, timeout: Duration) -> Result<R, WorkerError> {
        if !self.wait_timeout(timeout) {
            return Err(WorkerError::JoinTimeout {
                name: self.name,
                timeout,
            });
        }
        self.join()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
