use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::Value;

use crate::context::{BindContext, ExecutionContext, Transaction};
use crate::descriptor::{ColumnDef, EntityDescriptor};
use crate::entity_metadata::Entity;
use crate::query::QueryPlan;
use crate::scanner;
use crate::statements::Statements;
use crate::types::{RowbindError, RowbindResult};

/// CRUD access to one entity type.
///
/// Cloning is cheap: clones share the descriptor and statements and carry
/// their own execution context and depth.
pub struct Repository<T: Entity> {
    descriptor: &'static EntityDescriptor,
    statements: Arc<Statements>,
    ctx: ExecutionContext,
    depth: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor,
            statements: Arc::clone(&self.statements),
            ctx: self.ctx.clone(),
            depth: self.depth,
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.descriptor.type_name())
            .field("table", &self.descriptor.table())
            .field("depth", &self.depth)
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(ctx: ExecutionContext) -> RowbindResult<Self> {
        let descriptor = T::descriptor()?;
        Ok(Self {
            descriptor,
            statements: Arc::new(Statements::synthesize(descriptor)),
            ctx,
            depth: descriptor.default_depth(),
            _phantom: PhantomData,
        })
    }

    /// Override the recursion budget for subsequent calls
    pub fn set_depth(&mut self, depth: u32) -> &mut Self {
        self.depth = depth;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn table_name(&self) -> &str {
        self.descriptor.table()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.descriptor.column_names()
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub fn set_execution_context(&mut self, ctx: ExecutionContext) -> &mut Self {
        self.ctx = ctx;
        self
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Bind an existing transaction; later calls run inside it
    pub fn set_transaction(&mut self, transaction: Transaction) -> &mut Self {
        self.ctx = self.ctx.clone().with_transaction(transaction);
        self
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.ctx.transaction()
    }

    /// Begin a transaction for this repository alone
    pub async fn begin(&mut self) -> RowbindResult<Transaction> {
        let ctx = self.ctx.begin().await?;
        let tx = ctx.transaction().cloned().ok_or(RowbindError::NoTransaction)?;
        self.ctx = ctx;
        Ok(tx)
    }

    /// Commit the bound transaction and fall back to the ambient pool
    pub async fn commit(&mut self) -> RowbindResult<()> {
        self.ctx.commit().await?;
        self.ctx = self.ctx.detached();
        Ok(())
    }

    /// Roll back the bound transaction and fall back to the ambient pool
    pub async fn rollback(&mut self) -> RowbindResult<()> {
        self.ctx.rollback().await?;
        self.ctx = self.ctx.detached();
        Ok(())
    }

    pub async fn get_all(&self) -> RowbindResult<Vec<T>> {
        let plan = QueryPlan::bare(self.statements.select_all.as_str());
        let rows = self.ctx.run_query(&plan).await?;
        scanner::scan_all(&self.ctx, rows, self.depth).await
    }

    /// `Ok(None)` when no row has this identity
    pub async fn get_by_id(&self, id: impl Into<Value>) -> RowbindResult<Option<T>> {
        let plan = QueryPlan::new(self.statements.select_by_id.as_str(), vec![id.into()]);
        let row = self.ctx.run_query_row(&plan).await?;
        scanner::scan_one(&self.ctx, row, self.depth).await
    }

    /// Select with a caller predicate such as `first_name = ?`; `WHERE` is optional
    pub async fn get_by_criteria(&self, criteria: &str, args: Vec<Value>) -> RowbindResult<Vec<T>> {
        let plan = QueryPlan::new(self.statements.criteria(criteria), args);
        let rows = self.ctx.run_query(&plan).await?;
        scanner::scan_all(&self.ctx, rows, self.depth).await
    }

    /// Insert `item` and return its identity.
    ///
    /// An unset key (NULL or zero) is left to the store, which reports the
    /// generated value. Any other key is inserted as given and returned when
    /// it is an integer; a non-integer key yields the driver's last insert id.
    pub async fn create(&self, item: &T) -> RowbindResult<i64> {
        let table = self.descriptor.table();
        let pk = self.descriptor.primary_key();
        let key = write_value(item, pk);
        if key.as_ref().map_or(true, is_unset_key) {
            let args = self
                .descriptor
                .non_key_columns()
                .map(|column| required_value(item, self.descriptor, column))
                .collect::<RowbindResult<Vec<_>>>()?;
            let plan = QueryPlan::new(self.statements.insert_generated_key.as_str(), args);
            return self
                .ctx
                .run_insert(&plan, pk.name)
                .await
                .map_err(|err| RowbindError::write("insert", table, err));
        }

        let args = self
            .descriptor
            .columns()
            .iter()
            .map(|column| required_value(item, self.descriptor, column))
            .collect::<RowbindResult<Vec<_>>>()?;
        let plan = QueryPlan::new(self.statements.insert.as_str(), args);
        let outcome = self
            .ctx
            .run_exec(&plan)
            .await
            .map_err(|err| RowbindError::write("insert", table, err))?;
        Ok(key
            .as_ref()
            .and_then(integer_key)
            .unwrap_or(outcome.last_insert_id as i64))
    }

    pub async fn update(&self, item: &T) -> RowbindResult<()> {
        let table = self.descriptor.table();
        let sql = self
            .statements
            .update
            .as_deref()
            .ok_or_else(|| RowbindError::NothingToUpdate {
                entity: self.descriptor.type_name().to_string(),
            })?;
        let mut args = self
            .descriptor
            .non_key_columns()
            .map(|column| required_value(item, self.descriptor, column))
            .collect::<RowbindResult<Vec<_>>>()?;
        args.push(required_value(item, self.descriptor, self.descriptor.primary_key())?);

        let plan = QueryPlan::new(sql, args);
        self.ctx
            .run_exec(&plan)
            .await
            .map(|_| ())
            .map_err(|err| RowbindError::write("update", table, err))
    }

    pub async fn delete(&self, id: impl Into<Value>) -> RowbindResult<()> {
        let plan = QueryPlan::new(self.statements.delete.as_str(), vec![id.into()]);
        self.ctx
            .run_exec(&plan)
            .await
            .map(|_| ())
            .map_err(|err| RowbindError::write("delete", self.descriptor.table(), err))
    }
}

impl<T: Entity> BindContext for Repository<T> {
    fn bind_context(&mut self, ctx: ExecutionContext) {
        self.ctx = ctx;
    }
}

/// Column value for a write: the related entity's value when the column
/// carries a reference and the related entity holds a set value, the
/// field's own value otherwise.
///
/// A plain `T` relation that was never loaded holds `T::default()`, whose
/// zero or empty key must not replace the literal.
fn write_value<T: Entity>(item: &T, column: &ColumnDef) -> Option<Value> {
    if let Some(reference) = column.reference {
        if let Some(value) = item.related_value(reference.relation, reference.field) {
            if !is_unset_reference(&value) {
                return Some(value);
            }
        }
    }
    item.field_value(column.field)
}

fn required_value<T: Entity>(
    item: &T,
    desc: &EntityDescriptor,
    column: &ColumnDef,
) -> RowbindResult<Value> {
    write_value(item, column).ok_or_else(|| RowbindError::UnknownField {
        entity: desc.type_name().to_string(),
        field: column.field.to_string(),
    })
}

/// NULL or integer zero: the store assigns the identity
fn is_unset_key(value: &Value) -> bool {
    match value {
        Value::TinyInt(v) => v.map_or(true, |v| v == 0),
        Value::SmallInt(v) => v.map_or(true, |v| v == 0),
        Value::Int(v) => v.map_or(true, |v| v == 0),
        Value::BigInt(v) => v.map_or(true, |v| v == 0),
        Value::TinyUnsigned(v) => v.map_or(true, |v| v == 0),
        Value::SmallUnsigned(v) => v.map_or(true, |v| v == 0),
        Value::Unsigned(v) => v.map_or(true, |v| v == 0),
        Value::BigUnsigned(v) => v.map_or(true, |v| v == 0),
        Value::String(v) => v.is_none(),
        _ => false,
    }
}

/// Integer view of a caller-supplied key
fn integer_key(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(v) => v.map(i64::from),
        Value::SmallInt(v) => v.map(i64::from),
        Value::Int(v) => v.map(i64::from),
        Value::BigInt(v) => *v,
        Value::TinyUnsigned(v) => v.map(i64::from),
        Value::SmallUnsigned(v) => v.map(i64::from),
        Value::Unsigned(v) => v.map(i64::from),
        Value::BigUnsigned(v) => v.and_then(|v| i64::try_from(v).ok()),
        _ => None,
    }
}

/// Unset key, or an empty string
fn is_unset_reference(value: &Value) -> bool {
    match value {
        Value::String(Some(s)) => s.is_empty(),
        other => is_unset_key(other),
    }
}
