//! SQLite schema and seed data for the directory domain.

use rowbind::{EngineConfig, ExecutionContext, RowbindResult};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS user (id INTEGER PRIMARY KEY, first_name TEXT, email TEXT, group_id INTEGER)",
    "CREATE TABLE IF NOT EXISTS roles (id INTEGER PRIMARY KEY, name TEXT)",
    "CREATE TABLE IF NOT EXISTS user_roles (id INTEGER PRIMARY KEY, user_id INTEGER, role_id INTEGER)",
    "CREATE TABLE IF NOT EXISTS groups (id INTEGER PRIMARY KEY, name TEXT)",
];

const SEED: &[&str] = &[
    "INSERT INTO roles (name) VALUES ('admin')",
    "INSERT INTO roles (name) VALUES ('user')",
    "INSERT INTO groups (name) VALUES ('group1')",
    "INSERT INTO groups (name) VALUES ('group2')",
    "INSERT INTO user (first_name, email, group_id) VALUES ('admin', 'admin@admin.com', 1)",
    "INSERT INTO user (first_name, email, group_id) VALUES ('user', 'user@user.com', 1)",
    "INSERT INTO user_roles (user_id, role_id) VALUES (1, 1)",
    "INSERT INTO user_roles (user_id, role_id) VALUES (2, 2)",
];

pub async fn create_tables(db: &DatabaseConnection) -> RowbindResult<()> {
    for ddl in TABLES {
        db.execute_unprepared(ddl).await?;
    }
    Ok(())
}

/// Insert the fixture rows unless roles already exist
pub async fn seed(db: &DatabaseConnection) -> RowbindResult<()> {
    let count = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT count(*) FROM roles",
        ))
        .await?
        .map(|row| row.try_get_by_index::<i64>(0))
        .transpose()?
        .unwrap_or(0);
    if count > 0 {
        log::debug!("directory fixture already seeded ({} roles)", count);
        return Ok(());
    }
    for insert in SEED {
        db.execute_unprepared(insert).await?;
    }
    log::info!("seeded directory fixture");
    Ok(())
}

/// Connect, create and seed the schema, and return a context on the pool
pub async fn open(config: &EngineConfig) -> RowbindResult<ExecutionContext> {
    let db = config.connect().await?;
    create_tables(&db).await?;
    seed(&db).await?;
    Ok(config.context(db))
}
