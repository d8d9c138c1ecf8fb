use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SessionId;
use crate::model::response::QuizResponse;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("answered questions ({answered}) exceed total questions ({total})")]
    AnsweredExceedsTotal { answered: u32, total: u32 },

    #[error("completed_at is before started_at")]
    InvalidTimeRange,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("session {0} has not been completed")]
    NotCompleted(SessionId),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz-taking attempt and its progress counters.
///
/// `answered_questions` never exceeds `total_questions`, and `completed_at`
/// once set is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SessionRecord")]
pub struct QuizSession {
    session_id: SessionId,
    total_questions: u32,
    answered_questions: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Wire shape of a session, checked by `from_persisted` on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    session_id: SessionId,
    total_questions: u32,
    answered_questions: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRecord> for QuizSession {
    type Error = SessionStateError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        Self::from_persisted(
            record.session_id,
            record.total_questions,
            record.answered_questions,
            record.started_at,
            record.completed_at,
        )
    }
}

impl QuizSession {
    /// A fresh session with nothing answered.
    #[must_use]
    pub fn start(session_id: SessionId, total_questions: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            total_questions,
            answered_questions: 0,
            started_at,
            completed_at: None,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the counters or timestamps are inconsistent.
    pub fn from_persisted(
        session_id: SessionId,
        total_questions: u32,
        answered_questions: u32,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        if answered_questions > total_questions {
            return Err(SessionStateError::AnsweredExceedsTotal {
                answered: answered_questions,
                total: total_questions,
            });
        }
        if completed_at.is_some_and(|at| at < started_at) {
            return Err(SessionStateError::InvalidTimeRange);
        }

        Ok(Self {
            session_id,
            total_questions,
            answered_questions,
            started_at,
            completed_at,
        })
    }

    /// Merge the supplied fields; absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the merged record would break an invariant;
    /// `self` is unchanged in that case.
    pub fn apply(&mut self, update: &SessionUpdate) -> Result<(), SessionStateError> {
        let answered = update.answered_questions.unwrap_or(self.answered_questions);
        if answered > self.total_questions {
            return Err(SessionStateError::AnsweredExceedsTotal {
                answered,
                total: self.total_questions,
            });
        }
        let completed_at = update.completed_at.or(self.completed_at);
        if completed_at.is_some_and(|at| at < self.started_at) {
            return Err(SessionStateError::InvalidTimeRange);
        }

        self.answered_questions = answered;
        self.completed_at = completed_at;
        Ok(())
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answered_questions(&self) -> u32 {
        self.answered_questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Percentage of questions answered, rounded half up; `0` for an empty quiz.
    #[must_use]
    pub fn completion_rate(&self) -> u8 {
        completion_rate(self.answered_questions, self.total_questions)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_questions,
            answered: self.answered_questions,
            remaining: self.total_questions.saturating_sub(self.answered_questions),
            is_complete: self.is_complete(),
        }
    }
}

/// `round(100 * answered / total)` in integer arithmetic, `0` when `total == 0`.
#[must_use]
pub fn completion_rate(answered: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let answered = u64::from(answered.min(total));
    let total = u64::from(total);
    let rate = (200 * answered + total) / (2 * total);
    u8::try_from(rate).unwrap_or(100)
}

/// Partial update for a stored session. `None` means "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub answered_questions: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    #[must_use]
    pub fn answered(count: u32) -> Self {
        Self {
            answered_questions: Some(count),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            completed_at: Some(at),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answered_questions.is_none() && self.completed_at.is_none()
    }
}

/// Aggregated view of session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: u32,
    pub answered: u32,
    pub remaining: u32,
    pub is_complete: bool,
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Completion summary; this shape is exported and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_questions: u32,
    pub answered_questions: u32,
    pub completion_rate: u8,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Build the summary of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::NotCompleted` if `completed_at` is unset.
    pub fn for_session(session: &QuizSession) -> Result<Self, SummaryError> {
        let completed_at = session
            .completed_at()
            .ok_or_else(|| SummaryError::NotCompleted(session.session_id().clone()))?;

        Ok(Self {
            total_questions: session.total_questions(),
            answered_questions: session.answered_questions(),
            completion_rate: session.completion_rate(),
            started_at: session.started_at(),
            completed_at,
        })
    }

    /// Time between start and completion.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.completed_at - self.started_at
    }
}

/// Everything a collaborator needs after completion: the session, its
/// responses and the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub session: QuizSession,
    pub responses: Vec<QuizResponse>,
    pub summary: SessionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn sid() -> SessionId {
        SessionId::new("session-1").unwrap()
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(7, 10), 70);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(3, 3), 100);
        assert_eq!(completion_rate(0, 5), 0);
    }

    #[test]
    fn completion_rate_for_empty_quiz_is_zero() {
        assert_eq!(completion_rate(0, 0), 0);
        let session = QuizSession::start(sid(), 0, fixed_now());
        assert_eq!(session.completion_rate(), 0);
    }

    #[test]
    fn apply_merges_only_supplied_fields() {
        let now = fixed_now();
        let mut session = QuizSession::start(sid(), 3, now);

        session.apply(&SessionUpdate::answered(2)).unwrap();
        assert_eq!(session.answered_questions(), 2);
        assert_eq!(session.completed_at(), None);

        let done = now + Duration::minutes(4);
        session.apply(&SessionUpdate::completed(done)).unwrap();
        assert_eq!(session.answered_questions(), 2);
        assert_eq!(session.completed_at(), Some(done));

        session.apply(&SessionUpdate::default()).unwrap();
        assert_eq!(session.completed_at(), Some(done));
    }

    #[test]
    fn apply_rejects_counter_above_total() {
        let mut session = QuizSession::start(sid(), 2, fixed_now());
        let err = session.apply(&SessionUpdate::answered(3)).unwrap_err();
        assert_eq!(
            err,
            SessionStateError::AnsweredExceedsTotal {
                answered: 3,
                total: 2
            }
        );
        assert_eq!(session.answered_questions(), 0);
    }

    #[test]
    fn apply_rejects_completion_before_start() {
        let now = fixed_now();
        let mut session = QuizSession::start(sid(), 2, now);
        let err = session
            .apply(&SessionUpdate::completed(now - Duration::seconds(1)))
            .unwrap_err();
        assert_eq!(err, SessionStateError::InvalidTimeRange);
        assert!(!session.is_complete());
    }

    #[test]
    fn from_persisted_validates() {
        let now = fixed_now();
        assert!(QuizSession::from_persisted(sid(), 1, 2, now, None).is_err());
        assert!(
            QuizSession::from_persisted(sid(), 1, 1, now, Some(now - Duration::hours(1))).is_err()
        );
        let ok = QuizSession::from_persisted(sid(), 4, 1, now, Some(now)).unwrap();
        assert_eq!(
            ok.progress(),
            SessionProgress {
                total: 4,
                answered: 1,
                remaining: 3,
                is_complete: true,
            }
        );
    }

    #[test]
    fn summary_requires_completion() {
        let now = fixed_now();
        let mut session = QuizSession::start(sid(), 10, now);
        assert_eq!(
            SessionSummary::for_session(&session).unwrap_err(),
            SummaryError::NotCompleted(sid())
        );

        session.apply(&SessionUpdate::answered(7)).unwrap();
        session
            .apply(&SessionUpdate::completed(now + Duration::seconds(95)))
            .unwrap();
        let summary = SessionSummary::for_session(&session).unwrap();
        assert_eq!(summary.completion_rate, 70);
        assert_eq!(summary.duration(), Duration::seconds(95));
    }

    #[test]
    fn summary_serializes_with_stable_field_names() {
        let now = fixed_now();
        let mut session = QuizSession::start(sid(), 3, now);
        session.apply(&SessionUpdate::completed(now)).unwrap();
        let summary = SessionSummary::for_session(&session).unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "answeredQuestions",
                "completedAt",
                "completionRate",
                "startedAt",
                "totalQuestions"
            ]
        );
        assert_eq!(json["startedAt"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn deserializing_checks_session_invariants() {
        let session = QuizSession::start(sid(), 3, fixed_now());
        let json = serde_json::to_string(&session).unwrap();
        let back: QuizSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);

        let overfull = r#"{
            "sessionId": "session-1",
            "totalQuestions": 2,
            "answeredQuestions": 5,
            "startedAt": "2023-11-14T22:13:20Z",
            "completedAt": null
        }"#;
        let err = serde_json::from_str::<QuizSession>(overfull).unwrap_err();
        assert!(err.to_string().contains("exceed total questions"));

        let backwards = r#"{
            "sessionId": "session-1",
            "totalQuestions": 2,
            "answeredQuestions": 1,
            "startedAt": "2023-11-14T22:13:20Z",
            "completedAt": "2023-11-14T22:00:00Z"
        }"#;
        assert!(serde_json::from_str::<QuizSession>(backwards).is_err());
    }
}
