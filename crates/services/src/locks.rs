use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use quiz_core::model::SessionId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<SessionId, Arc<AsyncMutex<()>>>;

/// Hands out one async lock per session so read-modify-write sequences on a
/// session are serialized while different sessions proceed independently.
///
/// An entry lives only while some task holds or waits for it.
#[derive(Debug, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one session; releasing the last guard for a session
/// drops its registry entry.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<Mutex<LockMap>>,
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &SessionId) -> SessionGuard {
        let lock = {
            // The map only holds lock handles, so a poisoned guard is still usable.
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(session_id.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        SessionGuard {
            registry: Arc::clone(&self.inner),
            session_id: session_id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of sessions currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the handle under the map lock, so a count of one means
        // only the registry still refers to it.
        if map
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.session_id);
        }
    }
}
