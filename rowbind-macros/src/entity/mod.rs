pub mod attributes;
pub mod code_gen;
pub mod relation_shape;
pub mod table_name;

use proc_macro2::{Ident, TokenStream};
use syn::{DeriveInput, Type};

use crate::errors::EntityError;
use crate::primary_key::extract_primary_key;
use attributes::{parse_field_attrs, parse_struct_attrs, FieldAttrs, StructAttrs};
use relation_shape::Shape;

/// An annotated struct field
pub struct ModelField {
    pub ident: Ident,
    pub ty: Type,
    pub attrs: FieldAttrs,
    /// Shape and target entity for relation fields
    pub relation: Option<(Shape, Type)>,
}

impl ModelField {
    pub fn column_name(&self) -> Option<&str> {
        self.attrs.column.as_deref()
    }

    pub fn is_singular_relation(&self) -> bool {
        matches!(self.relation, Some((shape, _)) if shape.is_singular())
    }
}

/// Everything the derive knows about one entity
pub struct EntityModel {
    pub ident: Ident,
    pub struct_attrs: StructAttrs,
    /// Fields carrying `#[rowbind(...)]`, in declaration order
    pub fields: Vec<ModelField>,
}

impl EntityModel {
    pub fn from_derive_input(input: &DeriveInput) -> syn::Result<Self> {
        let named = match &input.data {
            syn::Data::Struct(syn::DataStruct {
                fields: syn::Fields::Named(fields),
                ..
            }) => &fields.named,
            _ => return Err(EntityError::NotNamedStruct.to_syn_error(input.ident.span())),
        };
        if !input.generics.params.is_empty() {
            return Err(EntityError::GenericEntity {
                entity_name: input.ident.to_string(),
            }
            .to_syn_error(input.ident.span()));
        }

        let mut fields = Vec::new();
        for field in named {
            if !field.attrs.iter().any(|attr| attr.path().is_ident("rowbind")) {
                continue;
            }
            let Some(ident) = field.ident.clone() else {
                continue;
            };
            let attrs = parse_field_attrs(field)?;
            let relation = if attrs.is_relation() {
                let Some(analyzed) = relation_shape::analyze(&field.ty) else {
                    return Err(EntityError::UnsupportedRelationShape {
                        field_name: ident.to_string(),
                    }
                    .to_syn_error(ident.span()));
                };
                Some(analyzed)
            } else {
                None
            };
            fields.push(ModelField {
                ident,
                ty: field.ty.clone(),
                attrs,
                relation,
            });
        }

        Ok(Self {
            ident: input.ident.clone(),
            struct_attrs: parse_struct_attrs(&input.attrs)?,
            fields,
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| f.attrs.column.is_some())
    }

    pub fn relations(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| f.relation.is_some())
    }

    fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.ident == name)
    }

    /// Annotation checks that do not need the primary key or table name
    pub fn validate(&self) -> syn::Result<()> {
        let entity_name = self.ident.to_string();
        if self.columns().next().is_none() {
            return Err(EntityError::NoColumns { entity_name }.to_syn_error(self.ident.span()));
        }

        let mut seen: Vec<(&str, &Ident)> = Vec::new();
        for field in self.columns() {
            let column = field.column_name().unwrap_or_default();
            if let Some((_, first)) = seen.iter().find(|(name, _)| *name == column) {
                return Err(EntityError::DuplicateColumn {
                    entity_name,
                    column: column.to_string(),
                    first: first.to_string(),
                    second: field.ident.to_string(),
                }
                .to_syn_error(field.ident.span()));
            }
            seen.push((column, &field.ident));
        }

        for field in &self.fields {
            let field_name = field.ident.to_string();
            let span = field.ident.span();
            if field.attrs.column.is_some() && field.attrs.is_relation() {
                return Err(EntityError::ColumnAndRelation { field_name }.to_syn_error(span));
            }
            if field.attrs.params.is_some() && !field.attrs.is_relation() {
                return Err(EntityError::MissingRequiredAttribute {
                    field_name,
                    attribute: "params",
                    requires: "relation",
                }
                .to_syn_error(span));
            }
            for param in field.attrs.param_names() {
                let is_column = self
                    .field(&param)
                    .map_or(false, |f| f.attrs.column.is_some());
                if !is_column {
                    return Err(EntityError::UnknownRelationParam {
                        field_name: field_name.clone(),
                        param,
                    }
                    .to_syn_error(span));
                }
            }
            if let Some(reference) = field.attrs.reference.as_ref() {
                if field.attrs.column.is_none() {
                    return Err(EntityError::MissingRequiredAttribute {
                        field_name,
                        attribute: "reference",
                        requires: "column",
                    }
                    .to_syn_error(reference.span()));
                }
                let value = reference.value();
                let Some((relation, target)) = value.split_once('.') else {
                    return Err(EntityError::InvalidReference {
                        field_name,
                        reference: value.clone(),
                    }
                    .to_syn_error(reference.span()));
                };
                if relation.trim().is_empty() || target.trim().is_empty() {
                    return Err(EntityError::InvalidReference {
                        field_name,
                        reference: value.clone(),
                    }
                    .to_syn_error(reference.span()));
                }
                let singular = self
                    .field(relation.trim())
                    .map_or(false, ModelField::is_singular_relation);
                if !singular {
                    return Err(EntityError::UnknownReferenceRelation {
                        field_name,
                        relation: relation.trim().to_string(),
                    }
                    .to_syn_error(reference.span()));
                }
            }
        }
        Ok(())
    }
}

pub fn generate_entity_impl(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse2(input) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error(),
    };
    expand(&ast).unwrap_or_else(syn::Error::into_compile_error)
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let model = EntityModel::from_derive_input(ast)?;
    model.validate()?;
    let table = table_name::extract_table_name(&model)?;
    let primary_key = extract_primary_key(&model)?;
    Ok(code_gen::generate(&model, &table, &primary_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn validate(input: DeriveInput) -> syn::Result<()> {
        EntityModel::from_derive_input(&input)?.validate()
    }

    #[test]
    fn accepts_relation_entity() {
        let result = validate(parse_quote! {
            struct User {
                #[rowbind(column = "id", primary_key)]
                user_id: i64,
                #[rowbind(column = "group_id", reference = "my_group.id")]
                group_id: Option<i64>,
                #[rowbind(relation = "id = ?", params = "group_id")]
                my_group: Option<Box<Group>>,
                #[rowbind(relation = "id in (select role_id from user_roles where user_id = ?)")]
                roles: Option<Vec<Role>>,
                cache: Vec<u8>,
            }
        });
        assert!(result.is_ok());
    }

    #[test]
    fn skips_unannotated_fields() {
        let input: DeriveInput = parse_quote! {
            struct Tag {
                #[rowbind(column = "id")]
                id: i64,
                scratch: String,
            }
        };
        let model = EntityModel::from_derive_input(&input).unwrap();
        assert_eq!(model.fields.len(), 1);
    }

    #[test]
    fn rejects_entities_without_columns() {
        assert!(validate(parse_quote! {
            struct Empty {
                #[rowbind(relation = "x = ?")]
                other: Vec<Other>,
            }
        })
        .is_err());
    }

    #[test]
    fn rejects_duplicate_columns() {
        assert!(validate(parse_quote! {
            struct Twice {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(column = "id")]
                other_id: i64,
            }
        })
        .is_err());
    }

    #[test]
    fn rejects_bad_references() {
        assert!(validate(parse_quote! {
            struct User {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(column = "group_id", reference = "my_group")]
                group_id: i64,
                #[rowbind(relation = "id = ?", params = "group_id")]
                my_group: Option<Group>,
            }
        })
        .is_err());
        assert!(validate(parse_quote! {
            struct User {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(column = "group_id", reference = "groups.id")]
                group_id: i64,
                #[rowbind(relation = "group_id = ?")]
                groups: Vec<Group>,
            }
        })
        .is_err());
    }

    #[test]
    fn rejects_unknown_params() {
        assert!(validate(parse_quote! {
            struct User {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(relation = "id = ?", params = "group_id")]
                my_group: Option<Group>,
            }
        })
        .is_err());
    }

    #[test]
    fn rejects_unsupported_shapes_and_generics() {
        let shape: DeriveInput = parse_quote! {
            struct User {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(relation = "user_id = ?")]
                roles: HashMap<i64, Role>,
            }
        };
        assert!(EntityModel::from_derive_input(&shape).is_err());

        let generic: DeriveInput = parse_quote! {
            struct Wrapper<T> {
                #[rowbind(column = "id")]
                id: i64,
                inner: T,
            }
        };
        assert!(EntityModel::from_derive_input(&generic).is_err());
    }
}
