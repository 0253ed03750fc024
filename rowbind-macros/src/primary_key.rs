//! Primary key selection: an explicit `primary_key` marker, else the column
//! field named `id`.

use crate::entity::{EntityModel, ModelField};
use crate::errors::EntityError;

/// The field chosen as primary key
pub struct PrimaryKeyInfo<'a> {
    pub field: &'a ModelField,
}

pub fn extract_primary_key(model: &EntityModel) -> syn::Result<PrimaryKeyInfo<'_>> {
    let mut marked: Option<&ModelField> = None;
    for field in model.fields.iter().filter(|f| f.attrs.primary_key) {
        if let Some(first) = marked {
            return Err(EntityError::MultiplePrimaryKeys {
                entity_name: model.ident.to_string(),
                first: first.ident.to_string(),
                second: field.ident.to_string(),
            }
            .to_syn_error(field.ident.span()));
        }
        if field.attrs.column.is_none() {
            return Err(EntityError::MissingRequiredAttribute {
                field_name: field.ident.to_string(),
                attribute: "primary_key",
                requires: "column",
            }
            .to_syn_error(field.ident.span()));
        }
        marked = Some(field);
    }

    if let Some(field) = marked {
        return Ok(PrimaryKeyInfo { field });
    }

    model
        .columns()
        .find(|f| f.ident == "id")
        .map(|field| PrimaryKeyInfo { field })
        .ok_or_else(|| {
            EntityError::NoPrimaryKey {
                entity_name: model.ident.to_string(),
            }
            .to_syn_error(model.ident.span())
        })
}
