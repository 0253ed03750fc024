use heck::ToSnakeCase;
use syn::LitStr;

use crate::entity::EntityModel;
use crate::errors::EntityError;

/// Check that field-level table overrides agree and return the name the
/// runtime descriptor will resolve: struct override, then field override,
/// then snake_case of the type name.
pub fn extract_table_name(model: &EntityModel) -> syn::Result<String> {
    let mut field_override: Option<&LitStr> = None;
    for field in &model.fields {
        let Some(table) = field.attrs.table.as_ref() else {
            continue;
        };
        match field_override {
            Some(first) if first.value() != table.value() => {
                return Err(EntityError::ConflictingTableNames {
                    entity_name: model.ident.to_string(),
                    first: first.value(),
                    second: table.value(),
                }
                .to_syn_error(table.span()));
            }
            Some(_) => {}
            None => field_override = Some(table),
        }
    }

    if let Some(table) = model.struct_attrs.table.as_ref() {
        return Ok(table.value());
    }
    if let Some(table) = field_override {
        return Ok(table.value());
    }
    Ok(model.ident.to_string().to_snake_case())
}
