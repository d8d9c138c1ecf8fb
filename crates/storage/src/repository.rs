use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Answer, QuizResponse, QuizSession, ResponseKey, SessionId, SessionUpdate};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of writing a response: the stored record and whether the pair was
/// answered for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub response: QuizResponse,
    pub was_new: bool,
}

/// Session store contract. Owns `QuizSession` records keyed by session id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session id already exists.
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing session is `Ok(None)`.
    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// Merge the supplied fields into a stored session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or if the merged record is
    /// invalid; a missing session is `Ok(None)`.
    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<Option<QuizSession>, StorageError>;
}

/// Response store contract. At most one response per `(session, question)`.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Insert or replace the response for `key`, atomically reporting whether
    /// it was absent before.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the response cannot be stored.
    async fn upsert_response(
        &self,
        key: ResponseKey,
        answer: Answer,
        answered_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StorageError>;

    /// All responses of a session, ordered by question id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_responses(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuizResponse>, StorageError>;

    /// Fetch one response.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a pair never answered is `Ok(None)`.
    async fn get_response(&self, key: &ResponseKey) -> Result<Option<QuizResponse>, StorageError>;

    /// Delete one response, reporting whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn remove_response(&self, key: &ResponseKey) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for tests and single-process use.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, QuizSession>>>,
    responses: Arc<Mutex<HashMap<ResponseKey, QuizResponse>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.entry(session.session_id().clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<Option<QuizSession>, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(stored) = guard.get_mut(id) else {
            return Ok(None);
        };
        let mut merged = stored.clone();
        merged
            .apply(update)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *stored = merged.clone();
        Ok(Some(merged))
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn upsert_response(
        &self,
        key: ResponseKey,
        answer: Answer,
        answered_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StorageError> {
        let mut guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let response = QuizResponse::new(key.clone(), answer, answered_at);
        let was_new = guard.insert(key, response.clone()).is_none();
        Ok(UpsertOutcome { response, was_new })
    }

    async fn list_responses(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuizResponse>, StorageError> {
        let guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<QuizResponse> = guard
            .values()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.question_id);
        Ok(found)
    }

    async fn get_response(&self, key: &ResponseKey) -> Result<Option<QuizResponse>, StorageError> {
        let guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn remove_response(&self, key: &ResponseKey) -> Result<bool, StorageError> {
        let mut guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(key).is_some())
    }
}

/// Aggregates session and response repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub responses: Arc<dyn ResponseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseRepository> = Arc::new(repo);
        Self {
            sessions,
            responses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::QuestionId;
    use quiz_core::time::fixed_now;

    fn sid(raw: &str) -> SessionId {
        SessionId::new(raw).unwrap()
    }

    fn key(session: &str, question: u32) -> ResponseKey {
        ResponseKey::new(sid(session), QuestionId::new(question).unwrap())
    }

    #[tokio::test]
    async fn duplicate_session_insert_conflicts() {
        let repo = InMemoryRepository::new();
        let session = QuizSession::start(sid("a"), 3, fixed_now());
        repo.insert_session(&session).await.unwrap();

        let err = repo.insert_session(&session).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing() {
        let repo = InMemoryRepository::new();
        repo.insert_session(&QuizSession::start(sid("a"), 3, fixed_now()))
            .await
            .unwrap();

        let updated = repo
            .update_session(&sid("a"), &SessionUpdate::answered(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.answered_questions(), 1);
        assert_eq!(
            repo.get_session(&sid("a")).await.unwrap().unwrap(),
            updated
        );

        let missing = repo
            .update_session(&sid("zzz"), &SessionUpdate::answered(1))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn invalid_update_leaves_record_untouched() {
        let repo = InMemoryRepository::new();
        repo.insert_session(&QuizSession::start(sid("a"), 1, fixed_now()))
            .await
            .unwrap();

        let err = repo
            .update_session(&sid("a"), &SessionUpdate::answered(2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        let stored = repo.get_session(&sid("a")).await.unwrap().unwrap();
        assert_eq!(stored.answered_questions(), 0);
    }

    #[tokio::test]
    async fn upsert_reports_first_write_only() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let first = repo
            .upsert_response(key("a", 1), Answer::Yes, now)
            .await
            .unwrap();
        assert!(first.was_new);

        let later = now + Duration::seconds(10);
        let second = repo
            .upsert_response(key("a", 1), Answer::No, later)
            .await
            .unwrap();
        assert!(!second.was_new);

        let stored = repo.get_response(&key("a", 1)).await.unwrap().unwrap();
        assert_eq!(stored.answer, Answer::No);
        assert_eq!(stored.answered_at, later);
    }

    #[tokio::test]
    async fn list_is_scoped_to_session() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.upsert_response(key("a", 2), Answer::True, now)
            .await
            .unwrap();
        repo.upsert_response(key("a", 1), Answer::Yes, now)
            .await
            .unwrap();
        repo.upsert_response(key("b", 1), Answer::No, now)
            .await
            .unwrap();

        let listed = repo.list_responses(&sid("a")).await.unwrap();
        let ids: Vec<u32> = listed.iter().map(|r| r.question_id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(repo.list_responses(&sid("c")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unanswered_pair_is_absent() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_response(&key("a", 9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removed_response_counts_as_new_again() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.upsert_response(key("a", 1), Answer::Yes, now)
            .await
            .unwrap();

        assert!(repo.remove_response(&key("a", 1)).await.unwrap());
        assert!(!repo.remove_response(&key("a", 1)).await.unwrap());

        let again = repo
            .upsert_response(key("a", 1), Answer::No, now)
            .await
            .unwrap();
        assert!(again.was_new);
    }

    #[tokio::test]
    async fn storage_aggregate_shares_state() {
        let storage = Storage::in_memory();
        storage
            .sessions
            .insert_session(&QuizSession::start(sid("a"), 2, fixed_now()))
            .await
            .unwrap();
        assert!(
            storage
                .sessions
                .get_session(&sid("a"))
                .await
                .unwrap()
                .is_some()
        );
    }
}
