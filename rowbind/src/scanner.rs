use sea_orm::{DbErr, QueryResult, TryGetable};

use crate::context::ExecutionContext;
use crate::entity_metadata::Entity;
use crate::resolver;
use crate::types::{RowbindError, RowbindResult};

/// Minimal row capability: read the column at `index` as `T`
pub trait ScanRow {
    fn scan<T: TryGetable>(&self, index: usize) -> Result<T, DbErr>;
}

impl ScanRow for QueryResult {
    fn scan<T: TryGetable>(&self, index: usize) -> Result<T, DbErr> {
        self.try_get_by_index::<T>(index)
    }
}

/// Read one column of `entity`, naming it in the error on mismatch
pub fn column<T: TryGetable, R: ScanRow>(
    row: &R,
    index: usize,
    entity: &str,
    column: &str,
) -> RowbindResult<T> {
    row.scan::<T>(index)
        .map_err(|err| RowbindError::decode(entity, column, err))
}

/// Scan every row, then hydrate relations of each entity with `depth`.
///
/// A row that fails to decode aborts the whole list.
pub async fn scan_all<T: Entity>(
    ctx: &ExecutionContext,
    rows: Vec<QueryResult>,
    depth: u32,
) -> RowbindResult<Vec<T>> {
    let mut items = rows
        .iter()
        .map(|row| T::scan_columns(row))
        .collect::<RowbindResult<Vec<T>>>()?;
    drop(rows);
    for item in items.iter_mut() {
        resolver::hydrate(item, ctx, depth).await?;
    }
    Ok(items)
}

/// Scan a single optional row and hydrate it
pub async fn scan_one<T: Entity>(
    ctx: &ExecutionContext,
    row: Option<QueryResult>,
    depth: u32,
) -> RowbindResult<Option<T>> {
    let Some(row) = row else {
        return Ok(None);
    };
    let mut item = T::scan_columns(&row)?;
    drop(row);
    resolver::hydrate(&mut item, ctx, depth).await?;
    Ok(Some(item))
}
