// Static entity metadata and the per-type capability trait implemented by `#[derive(Entity)]`

use sea_orm::Value;

use crate::context::ExecutionContext;
use crate::descriptor::EntityDescriptor;
use crate::resolver::RelationDescriptor;
use crate::scanner::ScanRow;
use crate::types::{BoxedFuture, RelationKind, RowbindResult};

/// Annotations of a single struct field
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub primary_key: bool,
    pub table_override: Option<&'static str>,
    pub relation: Option<&'static str>,
    pub relation_params: Option<&'static str>,
    pub reference: Option<&'static str>,
    pub relation_kind: Option<RelationKind>,
}

impl FieldMeta {
    /// A field with no annotations
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            primary_key: false,
            table_override: None,
            relation: None,
            relation_params: None,
            reference: None,
            relation_kind: None,
        }
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn table(mut self, table: &'static str) -> Self {
        self.table_override = Some(table);
        self
    }

    pub const fn relation(mut self, fragment: &'static str, kind: RelationKind) -> Self {
        self.relation = Some(fragment);
        self.relation_kind = Some(kind);
        self
    }

    pub const fn params(mut self, params: &'static str) -> Self {
        self.relation_params = Some(params);
        self
    }

    pub const fn reference(mut self, reference: &'static str) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Annotations of a whole entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityMetadata {
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub default_depth: Option<u32>,
    pub fields: &'static [FieldMeta],
}

/// Capability surface every mapped type provides.
///
/// The derive generates all of it from `#[rowbind(...)]` annotations; the
/// engine never touches entity fields except through these methods.
pub trait Entity: Default + Send + Sync + Sized + 'static {
    /// Field annotations in declaration order
    const METADATA: EntityMetadata;

    /// The descriptor for this type, built on first use and cached for the process
    fn descriptor() -> RowbindResult<&'static EntityDescriptor>;

    /// Allocate a new entity and bind every column from `row` in descriptor order
    fn scan_columns<R: ScanRow>(row: &R) -> RowbindResult<Self>;

    /// Value of a persisted field, by field name
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Value of `field` on the entity held by the singular relation `relation`,
    /// `None` when the relation is not populated
    fn related_value(&self, relation: &str, field: &str) -> Option<Value>;

    /// Fetch and assign the relation slot named by `relation.field`
    fn load_relation<'a>(
        &'a mut self,
        relation: &'a RelationDescriptor,
        ctx: &'a ExecutionContext,
        depth: u32,
    ) -> BoxedFuture<'a, RowbindResult<()>>;
}
