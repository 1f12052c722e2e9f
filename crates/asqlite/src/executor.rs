// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-affine task executor.
//!
//! One dedicated thread owns the SQLite handle. Tasks are closures over the
//! worker's [`Session`]; they are queued from any thread and run strictly in
//! submission order. The handle itself never leaves the worker: tasks only
//! ever see it as a borrow scoped to their own invocation.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use std::thread;

use asqlite_core::{AsqliteError, Result};
use tokio::sync::oneshot;
use tracing::{debug, info_span, trace, warn};

use crate::session::Session;

type Job = Box<dyn for<'c> FnOnce(&mut Session<'c>) + Send>;

enum Message {
    Run(Job),
    Close(oneshot::Sender<Result<()>>),
}

/// Handle to the worker thread and its FIFO queue.
pub(crate) struct Executor {
    sender: Mutex<Option<mpsc::Sender<Message>>>,
    thread_name: String,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("thread_name", &self.thread_name)
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

impl Executor {
    /// Open the resource synchronously on the calling thread, then hand it
    /// to a freshly spawned worker.
    ///
    /// This is the only code path that touches the handle outside the
    /// worker, and it runs before any task can be queued. It is consumed by
    /// connection construction and cannot be reached afterwards.
    pub(crate) fn bootstrap<F, T>(thread_name: &str, open: F) -> Result<(Self, T)>
    where
        F: FnOnce() -> Result<(rusqlite::Connection, T)>,
    {
        let (conn, extra) = open()?;
        let (sender, receiver) = mpsc::channel();
        let name = thread_name.to_string();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_main(conn, receiver))
            .map_err(|e| AsqliteError::internal(format!("failed to spawn worker thread: {e}")))?;

        debug!(thread = %name, "worker thread started");
        Ok((
            Self {
                sender: Mutex::new(Some(sender)),
                thread_name: name,
            },
            extra,
        ))
    }

    /// Queue `task` and return a handle resolving to its result.
    ///
    /// Enqueueing happens before this returns, so two calls made in sequence
    /// by one caller run in that sequence even if neither handle is awaited
    /// yet. A task that fails or panics only fails its own handle.
    pub(crate) fn run<F, R>(&self, task: F) -> TaskHandle<R>
    where
        F: for<'c> FnOnce(&mut Session<'c>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let job: Job = Box::new(move |session: &mut Session<'_>| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| task(session)))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(panic = %message, "task panicked on worker thread");
                    Err(AsqliteError::internal(format!("task panicked: {message}")))
                });
            // The caller may have stopped waiting; its result is discarded.
            let _ = reply.send(result);
        });
        self.submit(Message::Run(job));
        TaskHandle { receiver }
    }

    /// Queue `task` without waiting for it. Returns `false` if the worker no
    /// longer accepts work.
    pub(crate) fn spawn<F>(&self, task: F) -> bool
    where
        F: for<'c> FnOnce(&mut Session<'c>) + Send + 'static,
    {
        let job: Job = Box::new(move |session: &mut Session<'_>| {
            if panic::catch_unwind(AssertUnwindSafe(|| task(session))).is_err() {
                warn!("detached task panicked on worker thread");
            }
        });
        self.submit(Message::Run(job))
    }

    /// Stop accepting work and ask the worker to close the handle once every
    /// task queued before this call has run.
    ///
    /// Returns `None` if the executor was already closed.
    pub(crate) fn close(&self) -> Option<oneshot::Receiver<Result<()>>> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let (reply, receiver) = oneshot::channel();
        sender.send(Message::Close(reply)).ok()?;
        Some(receiver)
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn submit(&self, message: Message) -> bool {
        // Sending under the lock makes lock order the queue order.
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }
}

/// Pending result of an operation already queued on the worker.
///
/// Every connection operation is enqueued when the method is called, not
/// when the handle is first polled. Dropping the handle abandons the
/// result; the operation itself still runs.
#[must_use = "the operation runs regardless, but its result is lost unless awaited"]
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<Result<R>>,
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped reply means the task never ran: the queue was closed.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(AsqliteError::ClosedConnection)))
    }
}

fn worker_main(conn: rusqlite::Connection, receiver: mpsc::Receiver<Message>) {
    let thread_name = thread::current().name().unwrap_or("asqlite-worker").to_string();
    let span = info_span!("worker", thread = %thread_name);
    let _enter = span.enter();

    let mut close_reply = None;
    {
        let mut session = Session::new(&conn);
        while let Ok(message) = receiver.recv() {
            match message {
                Message::Run(job) => {
                    job(&mut session);
                    session.task_finished();
                    trace!(completed = session.stats().tasks_completed, "task finished");
                }
                Message::Close(reply) => {
                    close_reply = Some(reply);
                    break;
                }
            }
        }
        // Finalize every statement so the handle can actually close.
        session.release_all();
    }

    let closed = conn.close().map_err(|(_, e)| AsqliteError::from(e));
    match close_reply {
        Some(reply) => {
            let _ = reply.send(closed);
        }
        None => {
            if let Err(e) = closed {
                warn!(error = %e, "closing connection after last handle dropped failed");
            }
        }
    }
    // The close was the last message: `Executor::close` took the only sender.
    debug!("connection closed, worker thread exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn executor() -> Executor {
        let (executor, ()) = Executor::bootstrap("asqlite-test-worker", || {
            Ok((rusqlite::Connection::open_in_memory()?, ()))
        })
        .unwrap();
        executor
    }

    #[test]
    fn bootstrap_runs_on_the_calling_thread() {
        let caller = thread::current().id();
        let (_executor, opened_on) = Executor::bootstrap("asqlite-test-worker", || {
            Ok((rusqlite::Connection::open_in_memory()?, thread::current().id()))
        })
        .unwrap();
        assert_eq!(opened_on, caller);
    }

    #[test]
    fn bootstrap_failure_is_returned_directly() {
        let result = Executor::bootstrap::<_, ()>("asqlite-test-worker", || {
            Err(AsqliteError::Config("no".into()))
        });
        assert!(matches!(result, Err(AsqliteError::Config(_))));
    }

    #[tokio::test]
    async fn tasks_run_on_the_named_worker_thread() {
        let executor = executor();
        let name = executor
            .run(|_| Ok(thread::current().name().map(str::to_string)))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("asqlite-test-worker"));
        assert_ne!(
            executor.run(|_| Ok(thread::current().id())).await.unwrap(),
            thread::current().id()
        );
    }

    #[tokio::test]
    async fn handles_created_before_awaiting_keep_submission_order() {
        let executor = executor();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let log = log.clone();
                executor.run(move |_| {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();
        // Await in reverse; execution order is still submission order.
        for handle in handles.into_iter().rev() {
            handle.await.unwrap();
        }
        assert_eq!(*log.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn a_panicking_task_does_not_stop_the_worker() {
        let executor = executor();
        let err = executor
            .run(|_| -> Result<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, AsqliteError::Internal(ref m) if m.contains("boom")));
        assert_eq!(executor.run(|_| Ok(1 + 1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn close_drains_earlier_tasks_and_rejects_later_ones() {
        let executor = executor();
        let ran = Arc::new(AtomicUsize::new(0));
        let before: Vec<_> = (0..5)
            .map(|_| {
                let ran = ran.clone();
                executor.run(move |_| {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let closed = executor.close().expect("first close");
        assert!(executor.close().is_none(), "second close is a no-op");
        assert!(!executor.is_accepting());

        closed.await.unwrap().unwrap();
        for handle in before {
            handle.await.unwrap();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 5);

        let err = executor.run(|_| Ok(())).await.unwrap_err();
        assert!(err.is_closed());
        assert!(!executor.spawn(|_| {}));
    }

    #[tokio::test]
    async fn abandoned_results_are_still_executed() {
        let executor = executor();
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let ran = ran.clone();
            drop(executor.run(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        executor.run(|_| Ok(())).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
