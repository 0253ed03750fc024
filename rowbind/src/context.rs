//! Execution context: the one path every engine statement takes to the store.
//!
//! A context runs statements either on the ambient pool (one pooled
//! connection per call) or on a bound transaction. Contexts are cheap to
//! clone; clones share the bound transaction and the cancellation token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, QueryResult,
    TransactionTrait,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::query::QueryPlan;
use crate::types::{RowbindError, RowbindResult};

/// Result of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Handle to a transaction shared by every context and repository bound to it.
///
/// The slot is emptied by commit, rollback, or the automatic rollback after a
/// failed write. The mutex keeps a single statement in flight.
#[derive(Clone)]
pub struct Transaction {
    slot: Arc<Mutex<Option<DatabaseTransaction>>>,
}

impl Transaction {
    fn new(txn: DatabaseTransaction) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(txn))),
        }
    }

    /// False once the transaction has been committed or rolled back
    pub async fn is_open(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Whether two handles refer to the same transaction
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("slot", &Arc::as_ptr(&self.slot))
            .finish()
    }
}

#[derive(Clone)]
pub struct ExecutionContext {
    db: DatabaseConnection,
    transaction: Option<Transaction>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    statement_timeout: Option<Duration>,
}

impl ExecutionContext {
    /// Context running every statement on the ambient pool
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            transaction: None,
            cancel: CancellationToken::new(),
            deadline: None,
            statement_timeout: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Absolute deadline covering every statement issued through this context
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Upper bound for each individual statement
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Same pool, cancellation and deadline, but no transaction
    pub fn detached(&self) -> Self {
        Self {
            transaction: None,
            ..self.clone()
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Start a transaction and return a context bound to it
    pub async fn begin(&self) -> RowbindResult<ExecutionContext> {
        let txn = self.guarded(self.db.begin()).await?;
        log::debug!("transaction started");
        Ok(self.clone().with_transaction(Transaction::new(txn)))
    }

    pub async fn commit(&self) -> RowbindResult<()> {
        let tx = self.transaction.as_ref().ok_or(RowbindError::NoTransaction)?;
        let txn = tx
            .slot
            .lock()
            .await
            .take()
            .ok_or(RowbindError::TransactionClosed)?;
        txn.commit().await?;
        log::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the bound transaction; a no-op once it is already closed
    pub async fn rollback(&self) -> RowbindResult<()> {
        let tx = self.transaction.as_ref().ok_or(RowbindError::NoTransaction)?;
        let taken = tx.slot.lock().await.take();
        match taken {
            Some(txn) => {
                txn.rollback().await?;
                log::debug!("transaction rolled back");
            }
            None => log::debug!("rollback requested on a closed transaction"),
        }
        Ok(())
    }

    /// Run a statement and materialize every row
    pub async fn run_query(&self, plan: &QueryPlan) -> RowbindResult<Vec<QueryResult>> {
        let stmt = plan.to_statement(self.backend());
        log::debug!("query: {} ({} args)", stmt.sql, plan.args.len());
        match &self.transaction {
            Some(tx) => {
                let guard = tx.slot.lock().await;
                let txn = guard.as_ref().ok_or(RowbindError::TransactionClosed)?;
                let rows = self.guarded(txn.query_all(stmt)).await;
                rows
            }
            None => self.guarded(self.db.query_all(stmt)).await,
        }
    }

    /// Run a statement expected to match at most one row; no row is `Ok(None)`
    pub async fn run_query_row(&self, plan: &QueryPlan) -> RowbindResult<Option<QueryResult>> {
        let stmt = plan.to_statement(self.backend());
        log::debug!("query row: {} ({} args)", stmt.sql, plan.args.len());
        match &self.transaction {
            Some(tx) => {
                let guard = tx.slot.lock().await;
                let txn = guard.as_ref().ok_or(RowbindError::TransactionClosed)?;
                let row = self.guarded(txn.query_one(stmt)).await;
                row
            }
            None => self.guarded(self.db.query_one(stmt)).await,
        }
    }

    /// Run a write statement
    pub async fn run_exec(&self, plan: &QueryPlan) -> RowbindResult<ExecOutcome> {
        self.run_write(plan, None).await
    }

    /// Run an insert and return the generated identity.
    ///
    /// PostgreSQL reports it through `RETURNING <key_column>`, the other
    /// backends through the driver's last insert id.
    pub async fn run_insert(&self, plan: &QueryPlan, key_column: &str) -> RowbindResult<i64> {
        let outcome = self.run_write(plan, Some(key_column)).await?;
        Ok(outcome.last_insert_id as i64)
    }

    async fn run_write(
        &self,
        plan: &QueryPlan,
        returning: Option<&str>,
    ) -> RowbindResult<ExecOutcome> {
        let backend = self.backend();
        let plan = match (backend, returning) {
            (DbBackend::Postgres, Some(key)) => {
                QueryPlan::new(format!("{} RETURNING {}", plan.sql, key), plan.args.clone())
            }
            _ => plan.clone(),
        };
        let returning = returning.is_some() && backend == DbBackend::Postgres;
        let stmt = plan.to_statement(backend);
        log::debug!("exec: {} ({} args)", stmt.sql, plan.args.len());

        let Some(tx) = &self.transaction else {
            return self.guarded(execute_write(&self.db, stmt, returning)).await;
        };

        let mut guard = tx.slot.lock().await;
        let txn = guard.as_ref().ok_or(RowbindError::TransactionClosed)?;
        let write = match self.guarded(execute_write(txn, stmt, returning)).await {
            Ok(outcome) => return Ok(outcome),
            Err(write) => write,
        };

        // A failed write poisons the transaction: roll back before reporting
        let Some(txn) = guard.take() else {
            return Err(write);
        };
        log::warn!("write failed inside transaction, rolling back: {}", write);
        match txn.rollback().await {
            Ok(()) => Err(write),
            Err(rollback) => {
                log::error!("automatic rollback failed: {}", rollback);
                Err(RowbindError::RollbackFailed {
                    write: Box::new(write),
                    rollback,
                })
            }
        }
    }

    /// Race a driver call against cancellation, the deadline and the statement timeout
    async fn guarded<T, F>(&self, fut: F) -> RowbindResult<T>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        if self.cancel.is_cancelled() {
            return Err(RowbindError::Cancelled);
        }
        let limit = match (self.deadline, self.statement_timeout) {
            (Some(deadline), Some(timeout)) => Some(deadline.min(Instant::now() + timeout)),
            (Some(deadline), None) => Some(deadline),
            (None, Some(timeout)) => Some(Instant::now() + timeout),
            (None, None) => None,
        };
        if limit.is_some_and(|at| at <= Instant::now()) {
            return Err(RowbindError::DeadlineExceeded);
        }

        let bounded = async {
            match limit {
                Some(at) => match tokio::time::timeout_at(at, fut).await {
                    Ok(res) => res.map_err(RowbindError::from),
                    Err(_) => Err(RowbindError::DeadlineExceeded),
                },
                None => fut.await.map_err(RowbindError::from),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RowbindError::Cancelled),
            res = bounded => res,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("backend", &self.backend())
            .field("transaction", &self.transaction)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

async fn execute_write<C: ConnectionTrait>(
    conn: &C,
    stmt: sea_orm::Statement,
    returning: bool,
) -> Result<ExecOutcome, DbErr> {
    if returning {
        let row = conn
            .query_one(stmt)
            .await?
            .ok_or(DbErr::RecordNotInserted)?;
        let id = match row.try_get_by_index::<i64>(0) {
            Ok(id) => id,
            Err(_) => row.try_get_by_index::<i32>(0)? as i64,
        };
        return Ok(ExecOutcome {
            rows_affected: 1,
            last_insert_id: id as u64,
        });
    }
    let res = conn.execute(stmt).await?;
    Ok(ExecOutcome {
        rows_affected: res.rows_affected(),
        last_insert_id: res.last_insert_id(),
    })
}

/// Lets `begin_shared` bind repositories of different entity types to one transaction
pub trait BindContext {
    fn bind_context(&mut self, ctx: ExecutionContext);
}

/// Begin one transaction on `base` and bind it to every repository given
pub async fn begin_shared(
    base: &ExecutionContext,
    repositories: &mut [&mut dyn BindContext],
) -> RowbindResult<ExecutionContext> {
    let ctx = base.begin().await?;
    for repo in repositories.iter_mut() {
        repo.bind_context(ctx.clone());
    }
    Ok(ctx)
}
