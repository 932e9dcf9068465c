use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// One fair async mutex per sidecar path.
///
/// Every load-mutate-persist cycle holds the guard for its whole duration,
/// so at most one such cycle is in flight per store at a time even though
/// the individual filesystem calls are asynchronous. tokio's mutex queues
/// waiters in acquisition order, which gives the strict FIFO service the
/// store relies on to prevent lost updates. Stores for different workspaces
/// never contend. There is no timeout on acquisition: a stuck holder blocks
/// its store's queue (accepted single-process limitation).
#[derive(Debug, Default)]
pub struct StoreLocks {
    inner: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held for the duration of one read-modify-write cycle; released on drop,
/// including early return and error paths.
pub type StoreGuard = OwnedMutexGuard<()>;

impl StoreLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues behind any in-flight cycle for the same sidecar and returns
    /// once this caller holds the store exclusively.
    pub async fn acquire(&self, sidecar: &Path) -> StoreGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                map.entry(sidecar.to_path_buf())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        mutex.lock_owned().await
    }
}
