//! The serialization gate for single-connection databases.

use tokio::sync::{Mutex, MutexGuard};

/// Admits one database-touching operation at a time. Backed by
/// `tokio::sync::Mutex`, which queues waiters FIFO, so no caller starves.
/// Generic over the guarded state so tests can gate a stub resource.
#[derive(Debug)]
pub struct Governor<T> {
    gate: Mutex<T>,
}

impl<T> Governor<T> {
    pub fn new(state: T) -> Self {
        Self {
            gate: Mutex::new(state),
        }
    }

    /// Wait for exclusive access. The guard must be held for the whole
    /// operation, including any transaction it opens.
    pub async fn acquire(&self) -> MutexGuard<'_, T> {
        self.gate.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubConnection {
        in_flight: AtomicBool,
        overlapped: AtomicBool,
        operations: AtomicUsize,
    }

    impl StubConnection {
        async fn operate(&self) {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.in_flight.store(false, Ordering::SeqCst);
            self.operations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn concurrent_operations_never_overlap() {
        let governor = Arc::new(Governor::new(StubConnection {
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            operations: AtomicUsize::new(0),
        }));
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let governor = governor.clone();
                tokio::spawn(async move {
                    let guard = governor.acquire().await;
                    guard.operate().await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        let state = governor.acquire().await;
        assert!(!state.overlapped.load(Ordering::SeqCst));
        assert_eq!(state.operations.load(Ordering::SeqCst), 16);
    }
}
