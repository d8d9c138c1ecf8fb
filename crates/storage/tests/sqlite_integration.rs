use chrono::Duration;
use quiz_core::model::{Answer, QuestionId, QuizSession, ResponseKey, SessionId, SessionUpdate};
use quiz_core::time::fixed_now;
use storage::repository::{ResponseRepository, SessionRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn sid(raw: &str) -> SessionId {
    SessionId::new(raw).unwrap()
}

fn key(session: &str, question: u32) -> ResponseKey {
    ResponseKey::new(sid(session), QuestionId::new(question).unwrap())
}

#[tokio::test]
async fn sqlite_roundtrip_persists_session_lifecycle() {
    let repo = connect("memdb_session_lifecycle").await;
    let now = fixed_now();

    let session = QuizSession::start(sid("s1"), 3, now);
    repo.insert_session(&session).await.unwrap();
    let err = repo.insert_session(&session).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let fetched = repo.get_session(&sid("s1")).await.unwrap().expect("stored");
    assert_eq!(fetched, session);

    let updated = repo
        .update_session(&sid("s1"), &SessionUpdate::answered(2))
        .await
        .unwrap()
        .expect("exists");
    assert_eq!(updated.answered_questions(), 2);
    assert_eq!(updated.completed_at(), None);

    let done = now + Duration::minutes(3);
    let completed = repo
        .update_session(&sid("s1"), &SessionUpdate::completed(done))
        .await
        .unwrap()
        .expect("exists");
    assert_eq!(completed.answered_questions(), 2);
    assert_eq!(completed.completed_at(), Some(done));
    assert_eq!(completed.completion_rate(), 67);

    assert!(
        repo.update_session(&sid("missing"), &SessionUpdate::answered(1))
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.get_session(&sid("missing")).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_rejects_counter_above_total() {
    let repo = connect("memdb_counter_bound").await;
    repo.insert_session(&QuizSession::start(sid("s1"), 1, fixed_now()))
        .await
        .unwrap();

    let err = repo
        .update_session(&sid("s1"), &SessionUpdate::answered(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));

    let stored = repo.get_session(&sid("s1")).await.unwrap().unwrap();
    assert_eq!(stored.answered_questions(), 0);
}

#[tokio::test]
async fn sqlite_upsert_replaces_and_flags_first_write() {
    let repo = connect("memdb_upsert").await;
    let now = fixed_now();
    repo.insert_session(&QuizSession::start(sid("s1"), 3, now))
        .await
        .unwrap();
    repo.insert_session(&QuizSession::start(sid("s2"), 3, now))
        .await
        .unwrap();

    let first = repo
        .upsert_response(key("s1", 1), Answer::Yes, now)
        .await
        .unwrap();
    assert!(first.was_new);

    let later = now + Duration::seconds(5);
    let second = repo
        .upsert_response(key("s1", 1), Answer::No, later)
        .await
        .unwrap();
    assert!(!second.was_new);
    assert_eq!(second.response.answer, Answer::No);

    repo.upsert_response(key("s1", 2), Answer::True, later)
        .await
        .unwrap();
    repo.upsert_response(key("s2", 1), Answer::Agree, later)
        .await
        .unwrap();

    let stored = repo.get_response(&key("s1", 1)).await.unwrap().unwrap();
    assert_eq!(stored.answer, Answer::No);
    assert_eq!(stored.answered_at, later);

    let listed = repo.list_responses(&sid("s1")).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].question_id, QuestionId::new(1).unwrap());
    assert_eq!(listed[1].answer, Answer::True);

    assert!(repo.get_response(&key("s1", 3)).await.unwrap().is_none());

    assert!(repo.remove_response(&key("s1", 2)).await.unwrap());
    assert!(!repo.remove_response(&key("s1", 2)).await.unwrap());
    let readded = repo
        .upsert_response(key("s1", 2), Answer::False, later)
        .await
        .unwrap();
    assert!(readded.was_new);
}

#[tokio::test]
async fn sqlite_response_requires_existing_session() {
    let repo = connect("memdb_orphan_response").await;
    let err = repo
        .upsert_response(key("ghost", 1), Answer::Yes, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    repo.insert_session(&QuizSession::start(sid("s1"), 0, fixed_now()))
        .await
        .unwrap();
}
