use rowbind::{EngineConfig, ExecutionContext};
use sea_orm::ConnectionTrait;
use tempfile::TempDir;

#[cfg(test)]
#[allow(dead_code)]
pub async fn setup_test_db() -> (ExecutionContext, TempDir) {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("notes.db").display());
    let config = EngineConfig::new(url);
    let db = config.connect().await.unwrap();

    for ddl in [
        "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, author_id INTEGER, title TEXT)",
        "INSERT INTO authors (name) VALUES ('ada')",
        "INSERT INTO authors (name) VALUES ('brian')",
        "INSERT INTO notes (author_id, title) VALUES (1, 'engines')",
        "INSERT INTO notes (author_id, title) VALUES (1, 'looms')",
        "INSERT INTO notes (author_id, title) VALUES (2, 'pipes')",
    ] {
        db.execute_unprepared(ddl).await.unwrap();
    }

    (config.context(db), dir)
}
