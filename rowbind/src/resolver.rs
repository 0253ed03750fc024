//! Relation hydration.
//!
//! After an entity's columns are scanned, every relation field gets a
//! dependent query built from its annotation and the related entity's own
//! descriptor. Related rows are scanned and hydrated with one less level of
//! depth; when the child depth reaches zero no relation is resolved and the
//! fields keep their default value. There is no cycle detection: `User ->
//! Role -> User` terminates only because depth runs out.

use sea_orm::Value;

use crate::context::ExecutionContext;
use crate::descriptor::{EntityDescriptor, RelationField};
use crate::entity_metadata::Entity;
use crate::query::QueryPlan;
use crate::scanner;
use crate::statements::{projection, select_prefix, starts_with_keyword};
use crate::types::{BoxedFuture, RelationKind, RowbindError, RowbindResult};

/// One relation of one entity instance, ready to run
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub field: &'static str,
    pub kind: RelationKind,
    pub fragment: &'static str,
    pub params: Vec<Value>,
}

impl RelationDescriptor {
    /// Resolve the parameter values of `field` against `item`.
    ///
    /// Without explicit parameter fields the owner's primary key is the only
    /// parameter.
    pub fn derive<T: Entity>(
        item: &T,
        owner: &EntityDescriptor,
        field: &RelationField,
    ) -> RowbindResult<Self> {
        let sources: Vec<&str> = if field.params.is_empty() {
            vec![owner.primary_key().field]
        } else {
            field.params.clone()
        };
        let params = sources
            .into_iter()
            .map(|name| {
                item.field_value(name).ok_or_else(|| RowbindError::UnknownField {
                    entity: owner.type_name().to_string(),
                    field: name.to_string(),
                })
            })
            .collect::<RowbindResult<Vec<_>>>()?;
        Ok(Self {
            field: field.field,
            kind: field.kind,
            fragment: field.fragment,
            params,
        })
    }

    /// Query plan against the related entity's descriptor
    pub fn plan(&self, target: &EntityDescriptor) -> QueryPlan {
        QueryPlan::new(expand_fragment(self.fragment, target), self.params.clone())
    }
}

/// Turn a relation annotation into a full statement.
///
/// - `SELECT ...` is used verbatim
/// - `FROM ...` gets the related projection
/// - `WHERE ...` and bare predicates get projection and `FROM <related table>`
/// - a bare key such as `group_id` becomes `group_id = ?`
pub fn expand_fragment(fragment: &str, target: &EntityDescriptor) -> String {
    let fragment = fragment.trim();
    if starts_with_keyword(fragment, "SELECT") {
        return fragment.to_string();
    }
    if starts_with_keyword(fragment, "FROM") {
        return format!("SELECT {} {}", projection(target), fragment);
    }
    let predicate = if starts_with_keyword(fragment, "WHERE") {
        fragment["WHERE".len()..].trim()
    } else {
        fragment
    };
    if is_bare_key(predicate) {
        format!("{} WHERE {} = ?", select_prefix(target), predicate)
    } else {
        format!("{} WHERE {}", select_prefix(target), predicate)
    }
}

fn is_bare_key(predicate: &str) -> bool {
    let mut chars = predicate.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Resolve every relation of `item` with the remaining `depth`.
///
/// Relation failures are logged and leave the field unset; only cancellation
/// and deadline errors escape.
pub fn hydrate<'a, T: Entity>(
    item: &'a mut T,
    ctx: &'a ExecutionContext,
    depth: u32,
) -> BoxedFuture<'a, RowbindResult<()>> {
    Box::pin(async move {
        let child_depth = depth.saturating_sub(1);
        if child_depth == 0 {
            return Ok(());
        }
        let owner = T::descriptor()?;
        for field in owner.relations() {
            let relation = match RelationDescriptor::derive(&*item, owner, field) {
                Ok(relation) => relation,
                Err(err) => {
                    log::warn!(
                        "relation {}.{} left unset: {}",
                        owner.type_name(),
                        field.field,
                        err
                    );
                    continue;
                }
            };
            if let Err(err) = item.load_relation(&relation, ctx, child_depth).await {
                if err.is_interrupt() {
                    return Err(err);
                }
                log::warn!(
                    "relation {}.{} left unset: {}",
                    owner.type_name(),
                    field.field,
                    err
                );
            }
        }
        Ok(())
    })
}

/// Box a relation loader so every arm of a generated `load_relation` has the same type
pub fn boxed<'a, F>(future: F) -> BoxedFuture<'a, RowbindResult<()>>
where
    F: std::future::Future<Output = RowbindResult<()>> + Send + 'a,
{
    Box::pin(future)
}

/// Fetch the rows of one relation as `U`, hydrated with `depth`.
///
/// Singular relations read at most one row.
pub async fn fetch_related<U: Entity>(
    ctx: &ExecutionContext,
    relation: &RelationDescriptor,
    depth: u32,
) -> RowbindResult<Vec<U>> {
    let target = U::descriptor()?;
    let plan = relation.plan(target);
    if relation.kind.is_collection() {
        let rows = ctx.run_query(&plan).await?;
        scanner::scan_all::<U>(ctx, rows, depth).await
    } else {
        let row = ctx.run_query_row(&plan).await?;
        let item = scanner::scan_one::<U>(ctx, row, depth).await?;
        Ok(item.into_iter().collect())
    }
}
