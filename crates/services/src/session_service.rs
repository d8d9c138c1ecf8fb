use std::fmt;
use std::sync::Arc;

use quiz_core::model::{
    Answer, CompletionReport, Question, QuestionCatalog, QuestionId, QuizResponse, QuizSession,
    ResponseKey, SessionId, SessionProgress, SessionSummary, SessionUpdate,
};
use storage::repository::{ResponseRepository, SessionRepository, StorageError};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::config::ServiceConfig;
use crate::error::QuizServiceError;
use crate::locks::SessionLocks;

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// Validated request to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub session_id: SessionId,
    pub total_questions: u32,
}

impl NewSession {
    /// Validate a client-supplied session id.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::InvalidSessionId` if the id is blank or too long.
    pub fn new(
        session_id: impl Into<String>,
        total_questions: u32,
    ) -> Result<Self, QuizServiceError> {
        Ok(Self {
            session_id: SessionId::new(session_id)?,
            total_questions,
        })
    }

    /// A request with a freshly generated session id.
    #[must_use]
    pub fn generated(total_questions: u32) -> Self {
        Self {
            session_id: SessionId::generate(),
            total_questions,
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives the session lifecycle: start, answer, complete.
///
/// Holds no quiz state of its own; sessions and responses live in the
/// repositories and every read-modify-write on a session runs under that
/// session's lock.
pub struct SessionService {
    clock: Clock,
    catalog: Arc<QuestionCatalog>,
    sessions: Arc<dyn SessionRepository>,
    responses: Arc<dyn ResponseRepository>,
    config: ServiceConfig,
    locks: SessionLocks,
}

impl SessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<QuestionCatalog>,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            clock,
            catalog,
            sessions,
            responses,
            config,
            locks: SessionLocks::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Catalog questions in display order.
    #[must_use]
    pub fn list_questions(&self) -> &[Question] {
        self.catalog.list()
    }

    /// Catalog size as a session total.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        u32::try_from(self.catalog.len()).unwrap_or(u32::MAX)
    }

    /// Open a new session.
    ///
    /// `total_questions` is taken as given; callers pass the catalog size.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::SessionExists` if the id is taken, or a
    /// storage error.
    pub async fn start_session(
        &self,
        request: NewSession,
    ) -> Result<QuizSession, QuizServiceError> {
        let NewSession {
            session_id,
            total_questions,
        } = request;
        let session = QuizSession::start(session_id, total_questions, self.clock.now());

        match self.sessions.insert_session(&session).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => {
                warn!(session_id = %session.session_id(), "duplicate quiz session rejected");
                return Err(QuizServiceError::SessionExists(session.session_id().clone()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            session_id = %session.session_id(),
            total_questions,
            "quiz session started"
        );
        Ok(session)
    }

    /// Fetch a session.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::SessionNotFound` if the session does not exist.
    pub async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<QuizSession, QuizServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| QuizServiceError::SessionNotFound(session_id.clone()))
    }

    /// Progress counters for a session.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::SessionNotFound` if the session does not exist.
    pub async fn get_progress(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionProgress, QuizServiceError> {
        Ok(self.get_session(session_id).await?.progress())
    }

    /// Record or replace the answer to one question.
    ///
    /// The session's answered counter moves only when the question is answered
    /// for the first time.
    ///
    /// # Errors
    ///
    /// - `QuestionNotFound` if the question is not in the catalog.
    /// - `InvalidAnswer` if `answer` is not one of the question's two tokens.
    /// - `SessionNotFound` if the session does not exist.
    /// - `SessionCompleted` if the session is completed and locking is enabled.
    pub async fn submit_answer(
        &self,
        session_id: &SessionId,
        question_id: QuestionId,
        answer: &str,
    ) -> Result<QuizResponse, QuizServiceError> {
        let question = self
            .catalog
            .get(question_id)
            .ok_or(QuizServiceError::QuestionNotFound(question_id))?;
        let answer = parse_answer_for(question, answer)?;

        let _guard = self.locks.acquire(session_id).await;

        let session = self.get_session(session_id).await?;
        if self.config.lock_completed_sessions && session.is_complete() {
            warn!(session_id = %session_id, %question_id, "answer rejected for completed session");
            return Err(QuizServiceError::SessionCompleted(session_id.clone()));
        }

        let key = ResponseKey::new(session_id.clone(), question_id);
        let outcome = self
            .responses
            .upsert_response(key.clone(), answer, self.clock.now())
            .await?;

        if outcome.was_new {
            let answered = session.answered_questions();
            if answered < session.total_questions() {
                let bump = SessionUpdate::answered(answered + 1);
                let counted = match self.sessions.update_session(session_id, &bump).await {
                    Ok(Some(_)) => Ok(()),
                    Ok(None) => Err(QuizServiceError::SessionNotFound(session_id.clone())),
                    Err(e) => Err(QuizServiceError::from(e)),
                };
                if let Err(err) = counted {
                    self.discard_uncounted(&key).await;
                    return Err(err);
                }
            } else {
                warn!(
                    session_id = %session_id,
                    %question_id,
                    total_questions = session.total_questions(),
                    "answered counter already at total; not incremented"
                );
            }
        }

        debug!(
            session_id = %session_id,
            %question_id,
            answer = %answer,
            was_new = outcome.was_new,
            "answer recorded"
        );
        Ok(outcome.response)
    }

    /// All responses recorded for a session; empty for unknown sessions.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the responses cannot be read.
    pub async fn list_responses(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuizResponse>, QuizServiceError> {
        Ok(self.responses.list_responses(session_id).await?)
    }

    /// The stored answer for one question, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the response cannot be read.
    pub async fn get_response(
        &self,
        session_id: &SessionId,
        question_id: QuestionId,
    ) -> Result<Option<QuizResponse>, QuizServiceError> {
        let key = ResponseKey::new(session_id.clone(), question_id);
        Ok(self.responses.get_response(&key).await?)
    }

    /// Undo a first answer whose counter bump failed, so a retry counts it.
    async fn discard_uncounted(&self, key: &ResponseKey) {
        if let Err(e) = self.responses.remove_response(key).await {
            warn!(
                session_id = %key.session_id,
                question_id = %key.question_id,
                error = %e,
                "uncounted answer could not be removed"
            );
        }
    }

    /// Stamp the completion time and build the completion report.
    ///
    /// Completing again re-stamps the time unless completed sessions are locked,
    /// in which case the first stamp is kept.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::SessionNotFound` if the session does not exist.
    pub async fn complete_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CompletionReport, QuizServiceError> {
        let _guard = self.locks.acquire(session_id).await;

        let session = self.get_session(session_id).await?;
        let responses = self.responses.list_responses(session_id).await?;

        let session = if self.config.lock_completed_sessions && session.is_complete() {
            debug!(session_id = %session_id, "session already completed; keeping stamp");
            session
        } else {
            let completed_at = self.clock.now().max(session.started_at());
            self.sessions
                .update_session(session_id, &SessionUpdate::completed(completed_at))
                .await?
                .ok_or_else(|| QuizServiceError::SessionNotFound(session_id.clone()))?
        };

        let summary = SessionSummary::for_session(&session)?;

        info!(
            session_id = %session_id,
            answered_questions = summary.answered_questions,
            total_questions = summary.total_questions,
            completion_rate = summary.completion_rate,
            "quiz session completed"
        );

        Ok(CompletionReport {
            session,
            responses,
            summary,
        })
    }
}

fn parse_answer_for(question: &Question, raw: &str) -> Result<Answer, QuizServiceError> {
    let invalid = || QuizServiceError::InvalidAnswer {
        question_id: question.id(),
        answer: raw.to_string(),
        expected: question.kind(),
    };
    let answer: Answer = raw.parse().map_err(|_| invalid())?;
    if question.kind().accepts(answer) {
        Ok(answer)
    } else {
        Err(invalid())
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("clock", &self.clock)
            .field("questions", &self.catalog.len())
            .field("config", &self.config)
            .field("locked_sessions", &self.locks.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
