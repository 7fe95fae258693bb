//! In-memory session store.
//!
//! Sessions live in a fixed number of shards so that lookups on different
//! sessions rarely contend on the same lock. A shard lock is only held for map
//! operations; image work happens under the per-session mutex instead.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use retouch_core::AppError;
use retouch_processing::PixelBuffer;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("session limit of {limit} reached")]
    CapacityExceeded { limit: usize },
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => AppError::NotFound(format!("session {}", id)),
            SessionError::CapacityExceeded { limit } => {
                AppError::SessionCapacityExceeded { limit }
            }
        }
    }
}

/// Mutable editing state, only reachable through [`Session::lock`].
#[derive(Debug)]
pub struct SessionState {
    current: Arc<PixelBuffer>,
    history: Vec<Arc<PixelBuffer>>,
}

impl SessionState {
    pub fn current(&self) -> &Arc<PixelBuffer> {
        &self.current
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// Push the current image onto the history and replace it.
    pub fn commit(&mut self, next: PixelBuffer) {
        let previous = std::mem::replace(&mut self.current, Arc::new(next));
        self.history.push(previous);
    }

    /// Restore the previous image. Returns false when the history is empty.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self, original: &Arc<PixelBuffer>) {
        self.history.clear();
        self.current = Arc::clone(original);
    }
}

/// Published, read-only view of a session: what readers see between commits.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub image: Arc<PixelBuffer>,
    pub history_depth: usize,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    filename: Option<String>,
    uploaded_at: DateTime<Utc>,
    original: Arc<PixelBuffer>,
    state: Mutex<SessionState>,
    snapshot: StdRwLock<Snapshot>,
    last_access: StdMutex<Instant>,
}

impl Session {
    fn new(id: Uuid, original: PixelBuffer, filename: Option<String>) -> Self {
        let original = Arc::new(original);
        Self {
            id,
            filename,
            uploaded_at: Utc::now(),
            state: Mutex::new(SessionState {
                current: Arc::clone(&original),
                history: Vec::new(),
            }),
            snapshot: StdRwLock::new(Snapshot {
                image: Arc::clone(&original),
                history_depth: 0,
            }),
            original,
            last_access: StdMutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn original(&self) -> &Arc<PixelBuffer> {
        &self.original
    }

    /// Exclusive access for a mutation. Waiters are served in FIFO order.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.touch();
        self.state.lock().await
    }

    /// Make `state` visible to readers. Call while still holding the lock.
    pub fn publish(&self, state: &SessionState) {
        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *snapshot = Snapshot {
            image: Arc::clone(&state.current),
            history_depth: state.history.len(),
        };
    }

    /// The last committed image; never blocks on an in-flight mutation.
    pub fn snapshot(&self) -> Snapshot {
        self.touch();
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn touch(&self) {
        *self
            .last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        let last = *self
            .last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        now.saturating_duration_since(last)
    }
}

/// Sharded map of live sessions with an idle TTL and a capacity cap.
#[derive(Debug)]
pub struct SessionStore {
    shards: Vec<RwLock<HashMap<Uuid, Arc<Session>>>>,
    count: AtomicUsize,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self::with_shards(max_sessions, idle_ttl, 16)
    }

    pub fn with_shards(max_sessions: usize, idle_ttl: Duration, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            count: AtomicUsize::new(0),
            max_sessions,
            idle_ttl,
        }
    }

    fn shard(&self, id: &Uuid) -> &RwLock<HashMap<Uuid, Arc<Session>>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    fn reserve_slot(&self) -> bool {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_sessions).then_some(n + 1)
            })
            .is_ok()
    }

    /// Register a new session for `original`.
    ///
    /// When the store is full, idle sessions are evicted first; if that frees
    /// nothing the call fails instead of displacing an active session.
    pub async fn create(
        &self,
        original: PixelBuffer,
        filename: Option<String>,
    ) -> Result<Arc<Session>, SessionError> {
        if !self.reserve_slot() {
            self.evict_idle().await;
            if !self.reserve_slot() {
                tracing::warn!(limit = self.max_sessions, "Session capacity exceeded");
                return Err(SessionError::CapacityExceeded {
                    limit: self.max_sessions,
                });
            }
        }

        loop {
            let id = Uuid::new_v4();
            let mut shard = self.shard(&id).write().await;
            if shard.contains_key(&id) {
                continue;
            }
            let session = Arc::new(Session::new(id, original, filename));
            shard.insert(id, Arc::clone(&session));
            tracing::debug!(image_id = %id, sessions = self.len(), "Session created");
            return Ok(session);
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.shard(&id)
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        match self.shard(&id).write().await.remove(&id) {
            Some(_) => {
                self.count.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!(image_id = %id, "Session removed");
                Ok(())
            }
            None => Err(SessionError::NotFound(id)),
        }
    }

    /// Drop every session idle for longer than the TTL that no request is
    /// currently using. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        for shard in &self.shards {
            let mut map = shard.write().await;
            let before = map.len();
            map.retain(|_, session| {
                Arc::strong_count(session) > 1 || session.idle_for(now) <= self.idle_ttl
            });
            evicted += before - map.len();
        }
        if evicted > 0 {
            self.count.fetch_sub(evicted, Ordering::SeqCst);
            tracing::debug!(evicted, remaining = self.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_sessions
    }

    /// Periodically evict idle sessions. The task stops once the store is
    /// dropped. An interval of zero disables the sweeper.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }
        let store: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.evict_idle().await;
            }
        }))
    }
}
