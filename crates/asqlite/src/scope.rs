// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-level mutual exclusion for multi-statement sequences.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Shared lock behind [`crate::Connection::scope`].
pub(crate) type ScopeLock = Arc<Mutex<()>>;

/// Proof that the caller holds the connection's transaction scope.
///
/// While it is alive, no other caller can acquire the scope, so a sequence
/// such as `BEGIN; ...; COMMIT` issued by the holder is never interleaved
/// with another caller's sequence. Operations from callers that never take
/// the scope still interleave at single-operation granularity.
///
/// The scope is released when the guard is dropped, on every exit path.
/// It is not reentrant: acquiring it again while holding it waits forever.
#[must_use = "the scope is released as soon as the guard is dropped"]
pub struct TransactionScope {
    _guard: OwnedMutexGuard<()>,
}

impl TransactionScope {
    pub(crate) async fn acquire(lock: &ScopeLock) -> Self {
        let guard = lock.clone().lock_owned().await;
        trace!("transaction scope acquired");
        Self { _guard: guard }
    }

    pub(crate) fn try_acquire(lock: &ScopeLock) -> Option<Self> {
        lock.clone()
            .try_lock_owned()
            .ok()
            .map(|guard| Self { _guard: guard })
    }

    /// Release the scope now rather than at the end of the enclosing block.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        trace!("transaction scope released");
    }
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_release() {
        let lock: ScopeLock = Arc::new(Mutex::new(()));
        let first = TransactionScope::acquire(&lock).await;
        assert!(TransactionScope::try_acquire(&lock).is_none());

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _scope = TransactionScope::acquire(&lock).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        first.release();
        waiter.await.unwrap();
        assert!(TransactionScope::try_acquire(&lock).is_some());
    }

    #[tokio::test]
    async fn dropping_on_an_error_path_releases() {
        let lock: ScopeLock = Arc::new(Mutex::new(()));
        let result: Result<(), &str> = async {
            let _scope = TransactionScope::acquire(&lock).await;
            Err("failed midway")
        }
        .await;
        assert!(result.is_err());
        assert!(TransactionScope::try_acquire(&lock).is_some());
    }
}
