//! Application state shared by all handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::ai::{AiGrader, AiRecommender};
use crate::db::DbPool;
use crate::notify::ProgressEvents;
use crate::session::{AttemptStore, Services};
use crate::store::SqliteStore;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared application database (users, sessions, courses, results)
    pub db: DbPool,

    /// Quiz attempts in progress
    pub attempts: AttemptStore,

    /// Collaborators used to run and submit attempts
    pub services: Services,
}

impl AppState {
    /// Wire the SQLite-backed stores and the given AI ports together
    pub fn new<A>(db: DbPool, ai: Arc<A>, ai_timeout: Duration, events: ProgressEvents) -> Self
    where
        A: AiGrader + AiRecommender + 'static,
    {
        let store = Arc::new(SqliteStore::new(db.clone()));
        let services = Services {
            quizzes: store.clone(),
            results: store.clone(),
            resources: store,
            grader: ai.clone(),
            recommender: ai,
            events,
            ai_timeout,
        };

        Self {
            db,
            attempts: AttemptStore::new(),
            services,
        }
    }
}
