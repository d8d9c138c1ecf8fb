use std::sync::Arc;

use quiz_core::model::QuestionCatalog;
use storage::repository::Storage;

use crate::Clock;
use crate::config::ServiceConfig;
use crate::error::QuizServicesError;
use crate::session_service::SessionService;

/// Wires the session service to a storage backend and the question catalog.
#[derive(Clone)]
pub struct QuizServices {
    session_service: Arc<SessionService>,
}

impl QuizServices {
    /// Build services backed by process-local memory.
    #[must_use]
    pub fn in_memory(clock: Clock, catalog: QuestionCatalog, config: ServiceConfig) -> Self {
        Self::from_storage(Storage::in_memory(), clock, catalog, config)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: QuestionCatalog,
        config: ServiceConfig,
    ) -> Result<Self, QuizServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, catalog, config))
    }

    #[must_use]
    pub fn from_storage(
        storage: Storage,
        clock: Clock,
        catalog: QuestionCatalog,
        config: ServiceConfig,
    ) -> Self {
        let session_service = Arc::new(SessionService::new(
            clock,
            Arc::new(catalog),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.responses),
            config,
        ));
        Self { session_service }
    }

    #[must_use]
    pub fn session_service(&self) -> Arc<SessionService> {
        Arc::clone(&self.session_service)
    }
}
