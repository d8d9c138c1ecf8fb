use quiz_core::model::{QuizSession, SessionId, SessionUpdate};

use super::SqliteRepository;
use super::mapping::{conn, map_session_row};
use crate::repository::{SessionRepository, StorageError};

const SELECT_SESSION: &str = r"
    SELECT session_id, total_questions, answered_questions, started_at, completed_at
    FROM quiz_sessions
    WHERE session_id = ?1
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quiz_sessions (session_id, total_questions, answered_questions, started_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(session.session_id().as_str())
        .bind(i64::from(session.total_questions()))
        .bind(i64::from(session.answered_questions()))
        .bind(session.started_at())
        .bind(session.completed_at())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError> {
        let row = sqlx::query(SELECT_SESSION)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<Option<QuizSession>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Writing first takes the database write lock for the whole transaction.
        let res = sqlx::query(
            r"
            UPDATE quiz_sessions
            SET answered_questions = COALESCE(?2, answered_questions),
                completed_at = COALESCE(?3, completed_at)
            WHERE session_id = ?1
            ",
        )
        .bind(id.as_str())
        .bind(update.answered_questions.map(i64::from))
        .bind(update.completed_at)
        .execute(&mut *tx)
        .await;

        let res = match res {
            Ok(res) => res,
            Err(sqlx::Error::Database(db)) if db.is_check_violation() => {
                return Err(StorageError::Serialization(db.to_string()));
            }
            Err(e) => return Err(conn(e)),
        };
        if res.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query(SELECT_SESSION)
            .bind(id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        let session = map_session_row(&row)?;

        tx.commit().await.map_err(conn)?;
        Ok(Some(session))
    }
}
