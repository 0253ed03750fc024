use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::entity::{EntityModel, ModelField};
use crate::primary_key::PrimaryKeyInfo;

/// `impl ::rowbind::Entity` for a validated model
pub fn generate(model: &EntityModel, table: &str, primary_key: &PrimaryKeyInfo<'_>) -> TokenStream {
    let name = &model.ident;
    let name_str = name.to_string();

    let field_metas = model
        .fields
        .iter()
        .map(|field| field_meta(field, primary_key));
    let default_depth = match model.struct_attrs.depth {
        Some(depth) => quote!(::core::option::Option::Some(#depth)),
        None => quote!(::core::option::Option::None),
    };

    let scans = model.columns().enumerate().map(|(index, field)| {
        let ident = &field.ident;
        let ty = &field.ty;
        let column = field.column_name().unwrap_or_default();
        quote! {
            item.#ident = ::rowbind::scanner::column::<#ty, R>(row, #index, #name_str, #column)?;
        }
    });

    let field_values = model.columns().map(|field| {
        let ident = &field.ident;
        let key = ident.to_string();
        quote! {
            #key => ::core::option::Option::Some(::rowbind::sea_orm::Value::from(
                ::core::clone::Clone::clone(&self.#ident),
            )),
        }
    });

    let related_values = model.relations().filter_map(|field| {
        let (shape, target) = field.relation.as_ref()?;
        let related = shape.borrow_related(&field.ident)?;
        let key = field.ident.to_string();
        Some(quote! {
            #key => #related.and_then(|related: &#target| {
                <#target as ::rowbind::Entity>::field_value(related, field)
            }),
        })
    });

    let rows = format_ident!("rows");
    let loaders = model.relations().filter_map(|field| {
        let (shape, target) = field.relation.as_ref()?;
        let ident = &field.ident;
        let key = ident.to_string();
        let assign = shape.assign_from(&rows);
        Some(quote! {
            #key => ::rowbind::resolver::boxed(async move {
                let #rows = ::rowbind::resolver::fetch_related::<#target>(ctx, relation, depth).await?;
                self.#ident = #assign;
                ::core::result::Result::Ok(())
            }),
        })
    });

    quote! {
        impl ::rowbind::Entity for #name {
            const METADATA: ::rowbind::EntityMetadata = ::rowbind::EntityMetadata {
                type_name: #name_str,
                table: ::core::option::Option::Some(#table),
                default_depth: #default_depth,
                fields: &[#(#field_metas),*],
            };

            fn descriptor() -> ::rowbind::RowbindResult<&'static ::rowbind::EntityDescriptor> {
                static DESCRIPTOR: ::rowbind::once_cell::sync::OnceCell<::rowbind::EntityDescriptor> =
                    ::rowbind::once_cell::sync::OnceCell::new();
                DESCRIPTOR.get_or_try_init(|| {
                    ::rowbind::DescriptorBuilder::build(&<Self as ::rowbind::Entity>::METADATA)
                })
            }

            fn scan_columns<R: ::rowbind::ScanRow>(row: &R) -> ::rowbind::RowbindResult<Self> {
                let mut item = <Self as ::core::default::Default>::default();
                #(#scans)*
                ::core::result::Result::Ok(item)
            }

            fn field_value(&self, field: &str) -> ::core::option::Option<::rowbind::sea_orm::Value> {
                match field {
                    #(#field_values)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn related_value(
                &self,
                relation: &str,
                field: &str,
            ) -> ::core::option::Option<::rowbind::sea_orm::Value> {
                match relation {
                    #(#related_values)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn load_relation<'a>(
                &'a mut self,
                relation: &'a ::rowbind::RelationDescriptor,
                ctx: &'a ::rowbind::ExecutionContext,
                depth: u32,
            ) -> ::rowbind::BoxedFuture<'a, ::rowbind::RowbindResult<()>> {
                match relation.field {
                    #(#loaders)*
                    other => ::rowbind::resolver::boxed(async move {
                        ::core::result::Result::Err(::rowbind::RowbindError::UnknownRelation {
                            entity: #name_str.to_string(),
                            field: other.to_string(),
                        })
                    }),
                }
            }
        }
    }
}

/// `FieldMeta` builder chain for one field
fn field_meta(field: &ModelField, primary_key: &PrimaryKeyInfo<'_>) -> TokenStream {
    let name = field.ident.to_string();
    let mut meta = quote!(::rowbind::FieldMeta::new(#name));
    if let Some(column) = field.column_name() {
        meta = quote!(#meta.column(#column));
    }
    if field.ident == primary_key.field.ident {
        meta = quote!(#meta.primary_key());
    }
    if let Some(table) = field.attrs.table.as_ref() {
        meta = quote!(#meta.table(#table));
    }
    if let (Some(fragment), Some((shape, _))) = (field.attrs.relation.as_deref(), field.relation.as_ref()) {
        let kind = shape.kind_tokens();
        meta = quote!(#meta.relation(#fragment, #kind));
    }
    if let Some(params) = field.attrs.params.as_ref() {
        meta = quote!(#meta.params(#params));
    }
    if let Some(reference) = field.attrs.reference.as_ref() {
        meta = quote!(#meta.reference(#reference));
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary_key::extract_primary_key;
    use syn::parse_quote;

    fn expand(input: syn::DeriveInput) -> String {
        let model = EntityModel::from_derive_input(&input).unwrap();
        model.validate().unwrap();
        let pk = extract_primary_key(&model).unwrap();
        generate(&model, "user", &pk).to_string()
    }

    #[test]
    fn emits_metadata_chain() {
        let code = expand(parse_quote! {
            struct User {
                #[rowbind(column = "id", primary_key)]
                user_id: i64,
                #[rowbind(column = "group_id", reference = "my_group.id")]
                group_id: Option<i64>,
                #[rowbind(relation = "id = ?", params = "group_id")]
                my_group: Option<Box<Group>>,
            }
        });
        assert!(code.contains("FieldMeta :: new (\"user_id\") . column (\"id\") . primary_key ()"));
        assert!(code.contains(". reference (\"my_group.id\")"));
        assert!(code.contains(". params (\"group_id\")"));
        assert!(code.contains("RelationKind :: Optional"));
        assert!(code.contains("fetch_related :: < Group >"));
    }

    #[test]
    fn marks_fallback_primary_key() {
        let code = expand(parse_quote! {
            struct Group {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(column = "name")]
                name: String,
            }
        });
        assert!(code.contains("FieldMeta :: new (\"id\") . column (\"id\") . primary_key ()"));
        assert!(!code.contains("FieldMeta :: new (\"name\") . column (\"name\") . primary_key ()"));
    }

    #[test]
    fn scans_columns_in_declaration_order() {
        let code = expand(parse_quote! {
            struct Group {
                #[rowbind(column = "id")]
                id: i64,
                #[rowbind(column = "name")]
                name: String,
            }
        });
        let id = code.find("row , 0usize").unwrap();
        let name = code.find("row , 1usize").unwrap();
        assert!(id < name);
    }
}
