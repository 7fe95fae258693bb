//! Application state shared by every handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use retouch_core::Config;
use retouch_processing::{Catalog, UploadValidator};

use crate::services::{SessionDispatcher, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
    pub dispatcher: SessionDispatcher,
    pub validator: UploadValidator,
    pub started_at: Instant,
}

impl AppState {
    /// Build the state from configuration with the built-in operation catalog.
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(Catalog::builtin());
        let sessions = Arc::new(SessionStore::with_shards(
            config.max_sessions(),
            Duration::from_secs(config.session_idle_ttl_secs()),
            config.session_shard_count(),
        ));
        let validator = UploadValidator::new(
            config.max_upload_bytes(),
            config.allowed_extensions().to_vec(),
            config.allowed_content_types().to_vec(),
        );
        Self {
            dispatcher: SessionDispatcher::new(
                Arc::clone(&catalog),
                Arc::clone(&sessions),
                config.max_history_depth(),
            ),
            config,
            catalog,
            sessions,
            validator,
            started_at: Instant::now(),
        }
    }
}
