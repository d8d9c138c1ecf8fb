use chrono::{DateTime, Utc};
use quiz_core::model::{Answer, QuizResponse, ResponseKey, SessionId};

use super::SqliteRepository;
use super::mapping::{conn, map_response_row, question_id_to_i64};
use crate::repository::{ResponseRepository, StorageError, UpsertOutcome};

fn write_err(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        other => conn(other),
    }
}

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn upsert_response(
        &self,
        key: ResponseKey,
        answer: Answer,
        answered_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StorageError> {
        let question_id = question_id_to_i64(key.question_id);
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Exactly one concurrent writer can win the insert for a fresh pair.
        let inserted = sqlx::query(
            r"
            INSERT OR IGNORE INTO quiz_responses (session_id, question_id, answer, answered_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(key.session_id.as_str())
        .bind(question_id)
        .bind(answer.as_str())
        .bind(answered_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;
        let was_new = inserted.rows_affected() == 1;

        if !was_new {
            sqlx::query(
                r"
                UPDATE quiz_responses
                SET answer = ?3, answered_at = ?4
                WHERE session_id = ?1 AND question_id = ?2
                ",
            )
            .bind(key.session_id.as_str())
            .bind(question_id)
            .bind(answer.as_str())
            .bind(answered_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;

        Ok(UpsertOutcome {
            response: QuizResponse::new(key, answer, answered_at),
            was_new,
        })
    }

    async fn list_responses(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuizResponse>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT session_id, question_id, answer, answered_at
            FROM quiz_responses
            WHERE session_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            responses.push(map_response_row(&row)?);
        }
        Ok(responses)
    }

    async fn get_response(&self, key: &ResponseKey) -> Result<Option<QuizResponse>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, question_id, answer, answered_at
            FROM quiz_responses
            WHERE session_id = ?1 AND question_id = ?2
            ",
        )
        .bind(key.session_id.as_str())
        .bind(question_id_to_i64(key.question_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_response_row).transpose()
    }

    async fn remove_response(&self, key: &ResponseKey) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            DELETE FROM quiz_responses
            WHERE session_id = ?1 AND question_id = ?2
            ",
        )
        .bind(key.session_id.as_str())
        .bind(question_id_to_i64(key.question_id))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() == 1)
    }
}
