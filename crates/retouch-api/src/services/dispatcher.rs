//! Session dispatcher: apply, undo and reset.
//!
//! Each mutation runs in its own spawned task that holds the session mutex
//! for the whole read-transform-commit sequence. If the caller goes away
//! (client disconnect, request timeout) the task still finishes and commits,
//! so a session is never left half-updated.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use retouch_core::AppError;
use retouch_processing::{transforms, Catalog};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::sessions::{SessionStore, Snapshot};

/// Result of an undo request.
#[derive(Debug, Clone)]
pub enum UndoOutcome {
    Undone(Snapshot),
    /// The history was empty; the current image is returned unchanged.
    NothingToUndo(Snapshot),
}

impl UndoOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            UndoOutcome::Undone(s) | UndoOutcome::NothingToUndo(s) => s,
        }
    }

    pub fn undone(&self) -> bool {
        matches!(self, UndoOutcome::Undone(_))
    }
}

#[derive(Clone)]
pub struct SessionDispatcher {
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    max_history_depth: usize,
}

/// Run `task` to completion even if the awaiting future is dropped.
async fn detached<T, F>(task: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| AppError::Internal(format!("session task failed: {}", e)))?
}

impl SessionDispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        sessions: Arc<SessionStore>,
        max_history_depth: usize,
    ) -> Self {
        Self {
            catalog,
            sessions,
            max_history_depth,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Validate and apply one operation to the session's current image.
    ///
    /// Lookup and validation happen before the session is locked, so a bad
    /// request never waits behind other mutations or touches state. A session
    /// whose history is full must be undone or reset first.
    pub async fn apply(
        &self,
        image_id: Uuid,
        operation: &str,
        raw_params: &Map<String, Value>,
    ) -> Result<Snapshot, AppError> {
        let session = self.sessions.get(image_id).await?;
        let (op, params) = self.catalog.resolve(operation, raw_params)?;
        let limit = self.max_history_depth;

        detached(async move {
            let mut state = session.lock().await;
            if state.history_depth() >= limit {
                return Err(AppError::HistoryLimitExceeded { limit });
            }
            let input = Arc::clone(state.current());
            let started = Instant::now();

            let output =
                tokio::task::spawn_blocking(move || transforms::apply(op, &input, &params))
                    .await
                    .map_err(|e| AppError::Internal(format!("transform task failed: {}", e)))??;

            state.commit(output);
            session.publish(&state);
            tracing::info!(
                image_id = %session.id(),
                operation = %op,
                history_depth = state.history_depth(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Operation applied"
            );
            Ok(Snapshot {
                image: Arc::clone(state.current()),
                history_depth: state.history_depth(),
            })
        })
        .await
    }

    pub async fn undo(&self, image_id: Uuid) -> Result<UndoOutcome, AppError> {
        let session = self.sessions.get(image_id).await?;

        detached(async move {
            let mut state = session.lock().await;
            let undone = state.undo();
            let snapshot = Snapshot {
                image: Arc::clone(state.current()),
                history_depth: state.history_depth(),
            };
            if !undone {
                tracing::debug!(image_id = %session.id(), "{}", AppError::NothingToUndo);
                return Ok(UndoOutcome::NothingToUndo(snapshot));
            }
            session.publish(&state);
            tracing::info!(
                image_id = %session.id(),
                history_depth = snapshot.history_depth,
                "Operation undone"
            );
            Ok(UndoOutcome::Undone(snapshot))
        })
        .await
    }

    pub async fn reset(&self, image_id: Uuid) -> Result<Snapshot, AppError> {
        let session = self.sessions.get(image_id).await?;

        detached(async move {
            let mut state = session.lock().await;
            let discarded = state.history_depth();
            state.reset(session.original());
            session.publish(&state);
            tracing::info!(image_id = %session.id(), discarded, "Session reset");
            Ok(Snapshot {
                image: Arc::clone(state.current()),
                history_depth: 0,
            })
        })
        .await
    }

    /// Last committed state, without waiting for in-flight mutations.
    pub async fn view(&self, image_id: Uuid) -> Result<Snapshot, AppError> {
        Ok(self.sessions.get(image_id).await?.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_processing::PixelBuffer;
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher() -> (SessionDispatcher, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new(16, Duration::from_secs(60)));
        let dispatcher =
            SessionDispatcher::new(Arc::new(Catalog::builtin()), Arc::clone(&store), 64);
        (dispatcher, store)
    }

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let data = (0..w * h)
            .flat_map(|i| {
                let v = (i * 255 / (w * h)) as u8;
                [v, 255 - v, v / 2]
            })
            .collect();
        PixelBuffer::new(w, h, 3, data).unwrap()
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_apply_then_undo_restores_exactly() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(20, 10), None).await.unwrap().id();

        let applied = dispatcher
            .apply(id, "threshold", &params(json!({"value": 127})))
            .await
            .unwrap();
        assert_eq!(applied.history_depth, 1);
        assert_eq!(applied.image.channels(), 1);

        let outcome = dispatcher.undo(id).await.unwrap();
        assert!(outcome.undone());
        assert_eq!(*outcome.snapshot().image, gradient(20, 10));
        assert_eq!(outcome.snapshot().history_depth, 0);
    }

    #[tokio::test]
    async fn test_undo_on_original_is_a_no_op() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(4, 4), None).await.unwrap().id();
        let outcome = dispatcher.undo(id).await.unwrap();
        assert!(!outcome.undone());
        assert_eq!(*outcome.snapshot().image, gradient(4, 4));
    }

    #[tokio::test]
    async fn test_failed_validation_leaves_state_untouched() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(8, 8), None).await.unwrap().id();

        let err = dispatcher
            .apply(id, "canny", &params(json!({"low": 150, "high": 50})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter { .. }));

        let err = dispatcher
            .apply(id, "gaussian_blur", &params(json!({"intensity": 4})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter { .. }));

        let err = dispatcher.apply(id, "sepia", &Map::new()).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownOperation(_)));

        let view = dispatcher.view(id).await.unwrap();
        assert_eq!(view.history_depth, 0);
        assert_eq!(*view.image, gradient(8, 8));
    }

    #[tokio::test]
    async fn test_reset_discards_history() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(12, 12), None).await.unwrap().id();
        for op in ["grayscale", "normalize", "equalize"] {
            dispatcher.apply(id, op, &Map::new()).await.unwrap();
        }
        assert_eq!(dispatcher.view(id).await.unwrap().history_depth, 3);

        let reset = dispatcher.reset(id).await.unwrap();
        assert_eq!(reset.history_depth, 0);
        assert_eq!(*reset.image, gradient(12, 12));
        assert!(!dispatcher.undo(id).await.unwrap().undone());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .apply(Uuid::new_v4(), "grayscale", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies_are_serialized() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(32, 32), None).await.unwrap().id();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let op = if i % 2 == 0 { "gaussian_blur" } else { "flip" };
                    dispatcher.apply(id, op, &Map::new()).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(dispatcher.view(id).await.unwrap().history_depth, 8);
        for _ in 0..8 {
            assert!(dispatcher.undo(id).await.unwrap().undone());
        }
        assert_eq!(*dispatcher.view(id).await.unwrap().image, gradient(32, 32));
    }

    #[tokio::test]
    async fn test_dropped_request_still_commits() {
        let (dispatcher, store) = dispatcher();
        let id = store.create(gradient(64, 64), None).await.unwrap().id();

        let raw = params(json!({"intensity": 31}));
        let fut = dispatcher.apply(id, "gaussian_blur", &raw);
        // Poll once so the detached task is spawned, then abandon the request.
        let _ = tokio::time::timeout(Duration::from_millis(1), fut).await;

        let session = store.get(id).await.unwrap();
        let state = session.lock().await;
        assert_eq!(state.history_depth(), 1);
    }

    #[tokio::test]
    async fn test_history_limit_requires_undo() {
        let store = Arc::new(SessionStore::new(4, Duration::from_secs(60)));
        let dispatcher =
            SessionDispatcher::new(Arc::new(Catalog::builtin()), Arc::clone(&store), 2);
        let id = store.create(gradient(8, 8), None).await.unwrap().id();

        dispatcher.apply(id, "flip", &Map::new()).await.unwrap();
        dispatcher.apply(id, "flip", &Map::new()).await.unwrap();
        let err = dispatcher.apply(id, "flip", &Map::new()).await.unwrap_err();
        assert!(matches!(err, AppError::HistoryLimitExceeded { limit: 2 }));
        assert_eq!(dispatcher.view(id).await.unwrap().history_depth, 2);

        assert!(dispatcher.undo(id).await.unwrap().undone());
        assert_eq!(
            dispatcher.apply(id, "flip", &Map::new()).await.unwrap().history_depth,
            2
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_busy_session_does_not_block_others() {
        let (dispatcher, store) = dispatcher();
        let a = store.create(gradient(16, 16), None).await.unwrap().id();
        let b = store.create(gradient(16, 16), None).await.unwrap().id();

        let session_a = store.get(a).await.unwrap();
        let guard = session_a.lock().await;

        let pending = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.apply(a, "grayscale", &Map::new()).await })
        };

        let applied = tokio::time::timeout(
            Duration::from_secs(10),
            dispatcher.apply(b, "grayscale", &Map::new()),
        )
        .await
        .expect("apply on another session must not wait")
        .unwrap();
        assert_eq!(applied.history_depth, 1);
        assert!(!pending.is_finished());
        assert_eq!(dispatcher.view(a).await.unwrap().history_depth, 0);

        drop(guard);
        assert_eq!(pending.await.unwrap().unwrap().history_depth, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_images_during_apply() {
        let (dispatcher, store) = dispatcher();
        let input = gradient(256, 256);
        let session = store.create(input.clone(), None).await.unwrap();
        let id = session.id();

        let raw = params(json!({"intensity": 31}));
        let (op, resolved) = dispatcher.catalog().resolve("gaussian_blur", &raw).unwrap();
        let blurred = transforms::apply(op, &input, &resolved).unwrap();

        let writer = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.apply(id, "gaussian_blur", &raw).await })
        };

        let mut reads = 0;
        while !writer.is_finished() || reads == 0 {
            let view = dispatcher.view(id).await.unwrap();
            match view.history_depth {
                0 => assert!(Arc::ptr_eq(&view.image, session.original())),
                1 => assert_eq!(*view.image, blurred),
                other => panic!("unexpected history depth {other}"),
            }
            reads += 1;
            tokio::task::yield_now().await;
        }

        writer.await.unwrap().unwrap();
        let view = dispatcher.view(id).await.unwrap();
        assert_eq!(view.history_depth, 1);
        assert_eq!(*view.image, blurred);
    }
}
