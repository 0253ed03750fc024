mod helpers;

use std::time::Duration;

use rowbind::{EngineConfig, Entity, Repository, RowbindError};
use tokio::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "authors")]
pub struct Author {
    #[rowbind(column = "id")]
    pub id: i64,
    #[rowbind(column = "name")]
    pub name: String,
    #[rowbind(relation = "author_id = ?")]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "notes")]
pub struct Note {
    #[rowbind(column = "id")]
    pub id: i64,
    #[rowbind(column = "author_id")]
    pub author_id: i64,
    #[rowbind(column = "title")]
    pub title: String,
    #[rowbind(relation = "id = ?", params = "author_id")]
    pub author: Author,
    #[rowbind(relation = "missing_column = ?")]
    pub broken: Option<Vec<Note>>,
}

/// Entity whose only column is its key
#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "authors")]
pub struct AuthorKey {
    #[rowbind(column = "id")]
    pub id: i64,
}

/// Note whose author key is written from a loaded `author` when one is present
#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "notes")]
pub struct Draft {
    #[rowbind(column = "id")]
    pub id: i64,
    #[rowbind(column = "author_id", reference = "author.id")]
    pub author_id: i64,
    #[rowbind(column = "title")]
    pub title: String,
    #[rowbind(relation = "id = ?", params = "author_id")]
    pub author: Author,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "tags")]
pub struct Tag {
    #[rowbind(column = "id")]
    pub id: i64,
    #[rowbind(column = "label")]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[rowbind(table = "labels")]
pub struct Label {
    #[rowbind(column = "code", primary_key)]
    pub code: String,
    #[rowbind(column = "title")]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::helpers::setup_test_db;
    use super::*;

    #[tokio::test]
    async fn test_descriptor_surface() {
        let (ctx, _dir) = setup_test_db().await;
        let notes = Repository::<Note>::new(ctx).unwrap();
        assert_eq!(notes.table_name(), "notes");
        assert_eq!(notes.columns(), vec!["id", "author_id", "title"]);
        assert_eq!(notes.descriptor().primary_key().name, "id");
        assert_eq!(notes.depth(), rowbind::DEFAULT_DEPTH);
        assert_eq!(
            notes.statements().select_by_id,
            "SELECT id, author_id, title FROM notes WHERE id = ?"
        );
        // Same descriptor instance on every call
        assert!(std::ptr::eq(Note::descriptor().unwrap(), notes.descriptor()));
    }

    #[tokio::test]
    async fn test_collection_and_struct_relations() {
        let (ctx, _dir) = setup_test_db().await;
        let authors = Repository::<Author>::new(ctx.clone()).unwrap();

        let ada = authors.get_by_id(1).await.unwrap().unwrap();
        let titles: Vec<_> = ada.notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["engines", "looms"]);
        // Nested relations stop at the depth budget
        assert_eq!(ada.notes[0].author, Author::default());

        let notes = Repository::<Note>::new(ctx).unwrap();
        let pipes = notes.get_by_id(3).await.unwrap().unwrap();
        assert_eq!(pipes.author.name, "brian");
        assert!(pipes.author.notes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_struct_relation_keeps_default() {
        let (ctx, _dir) = setup_test_db().await;
        let notes = Repository::<Note>::new(ctx).unwrap();

        let id = notes
            .create(&Note {
                author_id: 99,
                title: "orphan".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let orphan = notes.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(orphan.title, "orphan");
        assert_eq!(orphan.author, Author::default());
    }

    #[tokio::test]
    async fn test_failed_relation_is_not_fatal() {
        let (ctx, _dir) = setup_test_db().await;
        let notes = Repository::<Note>::new(ctx).unwrap();

        let all = notes.get_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|n| n.broken.is_none()));
        assert_eq!(all[0].author.name, "ada");
    }

    #[tokio::test]
    async fn test_decode_failure_aborts_fetch() {
        let (ctx, _dir) = setup_test_db().await;
        let notes = Repository::<Note>::new(ctx.clone()).unwrap();
        rowbind::sea_orm::ConnectionTrait::execute_unprepared(
            ctx.db(),
            "INSERT INTO notes (author_id, title) VALUES (1, NULL)",
        )
        .await
        .unwrap();

        let err = notes.get_all().await.unwrap_err();
        match err {
            RowbindError::Decode { entity, column, .. } => {
                assert_eq!(entity, "Note");
                assert_eq!(column, "title");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let (ctx, _dir) = setup_test_db().await;
        let authors = Repository::<Author>::new(ctx.clone()).unwrap();

        ctx.cancel();
        let err = authors.get_all().await.unwrap_err();
        assert!(matches!(err, RowbindError::Cancelled));
        assert!(err.is_interrupt());

        let err = authors
            .create(&Author {
                name: "carl".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RowbindError::Cancelled));
    }

    #[tokio::test]
    async fn test_expired_deadline() {
        let (ctx, _dir) = setup_test_db().await;
        let expired = ctx.clone().with_deadline(Instant::now());
        let authors = Repository::<Author>::new(expired).unwrap();

        let err = authors.get_by_id(1).await.unwrap_err();
        assert!(matches!(err, RowbindError::DeadlineExceeded));

        // The parent context keeps no deadline
        let live = Repository::<Author>::new(ctx).unwrap();
        assert!(live.get_by_id(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_generous_timeouts_pass() {
        let (ctx, _dir) = setup_test_db().await;
        let bounded = ctx
            .with_timeout(Duration::from_secs(30))
            .with_statement_timeout(Duration::from_secs(10));
        let authors = Repository::<Author>::new(bounded).unwrap();
        assert_eq!(authors.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (ctx, _dir) = setup_test_db().await;
        let authors = Repository::<Author>::new(ctx.clone()).unwrap().with_depth(1);

        let mut brian = authors.get_by_id(2).await.unwrap().unwrap();
        brian.name = "brian k".to_string();
        authors.update(&brian).await.unwrap();
        assert_eq!(authors.get_by_id(2).await.unwrap().unwrap().name, "brian k");

        authors.delete(2).await.unwrap();
        assert!(authors.get_by_id(2).await.unwrap().is_none());

        let keys = Repository::<AuthorKey>::new(ctx).unwrap();
        let err = keys.update(&AuthorKey { id: 1 }).await.unwrap_err();
        assert!(matches!(err, RowbindError::NothingToUpdate { .. }));
    }

    #[tokio::test]
    async fn test_commit_and_closed_transaction() {
        let (ctx, _dir) = setup_test_db().await;
        let mut authors = Repository::<Author>::new(ctx.clone()).unwrap();

        let err = authors.commit().await.unwrap_err();
        assert!(matches!(err, RowbindError::NoTransaction));

        let tx = authors.begin().await.unwrap();
        let id = authors
            .create(&Author {
                name: "carl".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let tx_ctx = authors.execution_context().clone();
        authors.commit().await.unwrap();
        assert!(!tx.is_open().await);
        assert!(authors.transaction().is_none());

        // A context still bound to the finished transaction refuses work
        let stale = Repository::<Author>::new(tx_ctx).unwrap();
        let err = stale.get_all().await.unwrap_err();
        assert!(matches!(err, RowbindError::TransactionClosed));

        assert_eq!(authors.get_by_id(id).await.unwrap().unwrap().name, "carl");
    }

    #[tokio::test]
    async fn test_config_from_env() {
        std::env::set_var("ROWBIND_DATABASE_URL", "sqlite::memory:");
        std::env::set_var("ROWBIND_STATEMENT_TIMEOUT_MS", "1500");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.statement_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.max_connections, 10);
    }

    #[tokio::test]
    async fn test_unloaded_reference_keeps_literal_on_create() {
        let (ctx, _dir) = setup_test_db().await;
        let drafts = Repository::<Draft>::new(ctx).unwrap();

        let id = drafts
            .create(&Draft {
                author_id: 2,
                title: "gears".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let stored = drafts.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.author_id, 2);
        assert_eq!(stored.author.name, "brian");
    }

    #[tokio::test]
    async fn test_shallow_update_keeps_reference_literal() {
        let (ctx, _dir) = setup_test_db().await;
        let drafts = Repository::<Draft>::new(ctx).unwrap();

        let mut pipes = drafts.clone().with_depth(1).get_by_id(3).await.unwrap().unwrap();
        assert_eq!(pipes.author, Author::default());
        pipes.title = "valves".to_string();
        drafts.clone().with_depth(1).update(&pipes).await.unwrap();

        let stored = drafts.get_by_id(3).await.unwrap().unwrap();
        assert_eq!(stored.title, "valves");
        assert_eq!(stored.author_id, 2);

        // A loaded author still takes precedence over the literal
        let mut moved = stored.clone();
        moved.author_id = 2;
        moved.author.id = 1;
        drafts.update(&moved).await.unwrap();
        assert_eq!(drafts.get_by_id(3).await.unwrap().unwrap().author_id, 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_is_reported() {
        let (ctx, _dir) = setup_test_db().await;
        // SQLite ends the whole transaction itself on this conflict, so the
        // automatic rollback that follows the failed insert fails too
        rowbind::sea_orm::ConnectionTrait::execute_unprepared(
            ctx.db(),
            "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL UNIQUE ON CONFLICT ROLLBACK)",
        )
        .await
        .unwrap();

        let mut tags = Repository::<Tag>::new(ctx.clone()).unwrap();
        let tx = tags.begin().await.unwrap();
        let rust = Tag {
            label: "rust".to_string(),
            ..Default::default()
        };
        tags.create(&rust).await.unwrap();

        let err = tags.create(&rust).await.unwrap_err();
        match err {
            RowbindError::RollbackFailed { write, .. } => {
                assert!(matches!(*write, RowbindError::Query(_)));
            }
            other => panic!("expected rollback failure, got {other:?}"),
        }
        assert!(!tx.is_open().await);
        assert!(matches!(
            tags.execution_context().commit().await,
            Err(RowbindError::TransactionClosed)
        ));

        let fresh = Repository::<Tag>::new(ctx).unwrap();
        assert!(fresh.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_text_key_in_transaction() {
        let (ctx, _dir) = setup_test_db().await;
        rowbind::sea_orm::ConnectionTrait::execute_unprepared(
            ctx.db(),
            "CREATE TABLE labels (code TEXT PRIMARY KEY, title TEXT NOT NULL)",
        )
        .await
        .unwrap();

        let mut labels = Repository::<Label>::new(ctx.clone()).unwrap();
        let tx = labels.begin().await.unwrap();
        labels
            .create(&Label {
                code: "ops".to_string(),
                title: "operations".to_string(),
            })
            .await
            .unwrap();
        assert!(tx.is_open().await);
        labels.commit().await.unwrap();

        let ops = labels.get_by_id("ops").await.unwrap().unwrap();
        assert_eq!(ops.title, "operations");
    }

    #[tokio::test]
    async fn test_create_with_integer_key_returns_it() {
        let (ctx, _dir) = setup_test_db().await;
        let authors = Repository::<Author>::new(ctx).unwrap();
        let id = authors
            .create(&Author {
                id: 40,
                name: "dora".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(id, 40);
    }
}
