use chrono::Duration;
use course_core::model::{AuthSession, AuthToken, UserId, UserProfile};
use course_core::time::fixed_now;
use storage::repository::{SessionRepository, Storage};
use storage::sqlite::SqliteRepository;

fn session(token: &str, name: &str) -> AuthSession {
    AuthSession {
        token: AuthToken::new(token).unwrap(),
        user: UserProfile {
            id: UserId::new("learner-1"),
            name: name.into(),
            email: Some("learner@example.com".into()),
            role: Some("student".into()),
        },
        saved_at: fixed_now(),
    }
}

#[tokio::test]
async fn sqlite_session_roundtrip_and_replace() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load_session().await.unwrap().is_none());

    repo.save_session(&session("first-token", "Ada")).await.unwrap();
    let mut replacement = session("second-token", "Ada L.");
    replacement.saved_at = fixed_now() + Duration::hours(1);
    repo.save_session(&replacement).await.unwrap();

    let loaded = repo.load_session().await.unwrap().expect("session");
    assert_eq!(loaded, replacement);
    assert_eq!(loaded.token.expose(), "second-token");
}

#[tokio::test]
async fn sqlite_clear_session_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save_session(&session("token", "Ada")).await.unwrap();
    repo.clear_session().await.unwrap();
    repo.clear_session().await.unwrap();
    assert!(repo.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_facade_uses_sqlite_sessions() {
    let storage = Storage::sqlite("sqlite:file:memdb_session_facade?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage
        .sessions
        .save_session(&session("facade-token", "Grace"))
        .await
        .unwrap();
    let loaded = storage.sessions.load_session().await.unwrap().expect("session");
    assert_eq!(loaded.user.name, "Grace");
}

#[tokio::test]
async fn session_file_is_created_and_survives_reconnect() {
    let dir = std::env::temp_dir().join(format!("course-sessions-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sessions.db");
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());

    let first = Storage::sqlite(&url).await.expect("first open");
    first
        .sessions
        .save_session(&session("kept-token", "Ada"))
        .await
        .unwrap();
    assert!(path.exists());
    drop(first);

    let reopened = Storage::sqlite(&url).await.expect("reopen");
    let loaded = reopened.sessions.load_session().await.unwrap().expect("session");
    assert_eq!(loaded.token.expose(), "kept-token");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn malformed_database_url_is_rejected() {
    assert!(SqliteRepository::connect("postgres://localhost/sessions").await.is_err());
}
