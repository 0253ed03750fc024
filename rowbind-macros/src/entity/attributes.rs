//! `#[rowbind(...)]` attribute parsing.

use syn::{Attribute, Field, LitInt, LitStr};

/// Struct-level options: `#[rowbind(table = "users", depth = 3)]`
#[derive(Default)]
pub struct StructAttrs {
    pub table: Option<LitStr>,
    pub depth: Option<u32>,
}

/// Field-level options
#[derive(Default)]
pub struct FieldAttrs {
    pub column: Option<String>,
    pub primary_key: bool,
    pub table: Option<LitStr>,
    pub relation: Option<String>,
    pub params: Option<LitStr>,
    pub reference: Option<LitStr>,
}

impl FieldAttrs {
    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// Parameter field names in declaration order
    pub fn param_names(&self) -> Vec<String> {
        self.params
            .as_ref()
            .map(|lit| {
                lit.value()
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn rowbind_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("rowbind"))
}

pub fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for attr in rowbind_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                out.table = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("depth") {
                let lit: LitInt = meta.value()?.parse()?;
                out.depth = Some(lit.base10_parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute; expected `table` or `depth`"))
            }
        })?;
    }
    Ok(out)
}

pub fn parse_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in rowbind_attrs(&field.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().trim().is_empty() {
                    return Err(syn::Error::new(lit.span(), "column name cannot be empty"));
                }
                out.column = Some(lit.value());
            } else if meta.path.is_ident("primary_key") {
                out.primary_key = true;
            } else if meta.path.is_ident("table") {
                out.table = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("relation") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().trim().is_empty() {
                    return Err(syn::Error::new(lit.span(), "relation fragment cannot be empty"));
                }
                out.relation = Some(lit.value());
            } else if meta.path.is_ident("params") {
                out.params = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("reference") {
                out.reference = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error(
                    "unsupported field attribute; expected one of `column`, `primary_key`, `table`, `relation`, `params`, `reference`",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_column_and_key() {
        let field: Field = parse_quote! {
            #[rowbind(column = "id", primary_key, table = "roles")]
            id: i64
        };
        let attrs = parse_field_attrs(&field).unwrap();
        assert_eq!(attrs.column.as_deref(), Some("id"));
        assert!(attrs.primary_key);
        assert_eq!(attrs.table.as_ref().unwrap().value(), "roles");
        assert!(!attrs.is_relation());
    }

    #[test]
    fn parses_relation_params() {
        let field: Field = parse_quote! {
            #[rowbind(relation = "id = ?", params = "group_id, tenant_id")]
            group: Option<Group>
        };
        let attrs = parse_field_attrs(&field).unwrap();
        assert_eq!(attrs.relation.as_deref(), Some("id = ?"));
        assert_eq!(attrs.param_names(), vec!["group_id", "tenant_id"]);
    }

    #[test]
    fn ignores_foreign_attributes() {
        let field: Field = parse_quote! {
            #[serde(skip)]
            cache: Vec<u8>
        };
        let attrs = parse_field_attrs(&field).unwrap();
        assert!(attrs.column.is_none());
        assert!(!attrs.is_relation());
    }

    #[test]
    fn rejects_unknown_keys() {
        let field: Field = parse_quote! {
            #[rowbind(colum = "id")]
            id: i64
        };
        assert!(parse_field_attrs(&field).is_err());
    }

    #[test]
    fn parses_struct_options() {
        let input: syn::DeriveInput = parse_quote! {
            #[rowbind(table = "people", depth = 3)]
            struct Person { id: i64 }
        };
        let attrs = parse_struct_attrs(&input.attrs).unwrap();
        assert_eq!(attrs.table.unwrap().value(), "people");
        assert_eq!(attrs.depth, Some(3));
    }
}
