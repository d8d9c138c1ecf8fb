use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, ResponseKey, SessionId};
use crate::model::question::Answer;

/// The live answer to one question within one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub answer: Answer,
    pub answered_at: DateTime<Utc>,
}

impl QuizResponse {
    #[must_use]
    pub fn new(key: ResponseKey, answer: Answer, answered_at: DateTime<Utc>) -> Self {
        Self {
            session_id: key.session_id,
            question_id: key.question_id,
            answer,
            answered_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> ResponseKey {
        ResponseKey::new(self.session_id.clone(), self.question_id)
    }
}
