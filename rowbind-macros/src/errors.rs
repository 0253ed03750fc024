//! Error types for derive failures.
//! Each one becomes a `compile_error!` pointing at the offending item.

use proc_macro2::Span;
use syn::Error;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("#[derive(Entity)] only supports structs with named fields")]
    NotNamedStruct,

    #[error("#[derive(Entity)] does not support generic entities; '{entity_name}' declares generic parameters")]
    GenericEntity { entity_name: String },

    #[error("Entity '{entity_name}' has no columns.\n\nAnnotate at least one field:\n    #[rowbind(column = \"id\")]\n    id: i64,")]
    NoColumns { entity_name: String },

    #[error("No primary key field found in entity '{entity_name}'.\n\nAdd `primary_key` to a column or name a column field 'id'.\n\nExample:\n    #[rowbind(column = \"id\", primary_key)]\n    user_id: i64,")]
    NoPrimaryKey { entity_name: String },

    #[error("Multiple primary key fields found in entity '{entity_name}' ('{first}' and '{second}'). Mark exactly one field with `primary_key`.")]
    MultiplePrimaryKeys {
        entity_name: String,
        first: String,
        second: String,
    },

    #[error("Column '{column}' is mapped by both '{first}' and '{second}' in entity '{entity_name}'.")]
    DuplicateColumn {
        entity_name: String,
        column: String,
        first: String,
        second: String,
    },

    #[error("Field '{field_name}' cannot be both a column and a relation.")]
    ColumnAndRelation { field_name: String },

    #[error("`{attribute}` on field '{field_name}' requires `{requires}`.")]
    MissingRequiredAttribute {
        field_name: String,
        attribute: &'static str,
        requires: &'static str,
    },

    #[error("Invalid reference '{reference}' on field '{field_name}'. Expected \"relation_field.target_field\".")]
    InvalidReference {
        field_name: String,
        reference: String,
    },

    #[error("Reference on field '{field_name}' names '{relation}', which is not a singular relation field of this entity.")]
    UnknownReferenceRelation {
        field_name: String,
        relation: String,
    },

    #[error("Relation parameter '{param}' on field '{field_name}' is not a column field of this entity.")]
    UnknownRelationParam { field_name: String, param: String },

    #[error("Unsupported relation field type for '{field_name}'. Supported shapes: T, Box<T>, Option<T>, Option<Box<T>>, Vec<T>, Option<Vec<T>>.")]
    UnsupportedRelationShape { field_name: String },

    #[error("Conflicting table names '{first}' and '{second}' in entity '{entity_name}'.")]
    ConflictingTableNames {
        entity_name: String,
        first: String,
        second: String,
    },
}

impl EntityError {
    /// Convert to syn::Error for compilation
    pub fn to_syn_error(&self, span: Span) -> Error {
        Error::new(span, self.to_string())
    }
}
