//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionId, QuestionType, SessionId, SessionIdError, SummaryError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification of service failures for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz session {0} not found")]
    SessionNotFound(SessionId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("answer {answer:?} is not valid for question {question_id} ({expected})")]
    InvalidAnswer {
        question_id: QuestionId,
        answer: String,
        expected: QuestionType,
    },
    #[error("invalid session id: {0}")]
    InvalidSessionId(#[from] SessionIdError),
    #[error("quiz session {0} already exists")]
    SessionExists(SessionId),
    #[error("quiz session {0} is already completed")]
    SessionCompleted(SessionId),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::QuestionNotFound(_) => ErrorKind::NotFound,
            Self::InvalidAnswer { .. } | Self::InvalidSessionId(_) => ErrorKind::Validation,
            Self::SessionExists(_) | Self::SessionCompleted(_) => ErrorKind::Conflict,
            Self::Summary(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

/// Errors emitted while bootstrapping quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let sid = SessionId::new("s").unwrap();
        let qid = QuestionId::new(1).unwrap();

        assert_eq!(
            QuizServiceError::SessionNotFound(sid.clone()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            QuizServiceError::QuestionNotFound(qid).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            QuizServiceError::InvalidAnswer {
                question_id: qid,
                answer: "maybe".into(),
                expected: QuestionType::YesNo,
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            QuizServiceError::from(SessionIdError::Empty).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            QuizServiceError::SessionExists(sid.clone()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            QuizServiceError::SessionCompleted(sid).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            QuizServiceError::from(StorageError::Connection("down".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn invalid_answer_message_names_expected_type() {
        let err = QuizServiceError::InvalidAnswer {
            question_id: QuestionId::new(4).unwrap(),
            answer: "agree".into(),
            expected: QuestionType::TrueFalse,
        };
        assert_eq!(
            err.to_string(),
            "answer \"agree\" is not valid for question 4 (true-false)"
        );
    }
}
