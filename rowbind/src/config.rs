use std::time::Duration;

use ::config::{Config, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;

use crate::context::ExecutionContext;
use crate::types::RowbindResult;

/// Connection and pool settings.
///
/// Environment variables use the `ROWBIND_` prefix:
/// - `ROWBIND_DATABASE_URL=sqlite://app.db?mode=rwc`
/// - `ROWBIND_MAX_CONNECTIONS=20`
/// - `ROWBIND_STATEMENT_TIMEOUT_MS=2000`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub statement_timeout_ms: Option<u64>,
    #[serde(default)]
    pub sql_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    8
}

impl EngineConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            statement_timeout_ms: None,
            sql_logging: false,
        }
    }

    pub fn from_env() -> RowbindResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ROWBIND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.database_url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .sqlx_logging(self.sql_logging);
        opt
    }

    pub async fn connect(&self) -> RowbindResult<DatabaseConnection> {
        log::debug!(
            "connecting (max_connections={}, min_connections={})",
            self.max_connections,
            self.min_connections
        );
        Ok(Database::connect(self.connect_options()).await?)
    }

    /// Context on `db` carrying the configured statement timeout
    pub fn context(&self, db: DatabaseConnection) -> ExecutionContext {
        let ctx = ExecutionContext::new(db);
        match self.statement_timeout() {
            Some(timeout) => ctx.with_statement_timeout(timeout),
            None => ctx,
        }
    }
}
