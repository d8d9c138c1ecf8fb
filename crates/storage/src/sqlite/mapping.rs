use quiz_core::model::{Answer, QuestionId, QuizResponse, QuizSession, SessionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    QuestionId::new(u32_from_i64("question_id", v)?).map_err(ser)
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> i64 {
    i64::from(id.value())
}

pub(crate) fn session_id_from_str(raw: String) -> Result<SessionId, StorageError> {
    SessionId::new(raw).map_err(ser)
}

pub(crate) fn parse_answer(s: &str) -> Result<Answer, StorageError> {
    s.parse::<Answer>().map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<QuizSession, StorageError> {
    let session_id = session_id_from_str(row.try_get("session_id").map_err(ser)?)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let answered = u32_from_i64(
        "answered_questions",
        row.try_get::<i64, _>("answered_questions").map_err(ser)?,
    )?;

    QuizSession::from_persisted(
        session_id,
        total,
        answered,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<QuizResponse, StorageError> {
    let answer: String = row.try_get("answer").map_err(ser)?;
    Ok(QuizResponse {
        session_id: session_id_from_str(row.try_get("session_id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        answer: parse_answer(&answer)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}
