//! Classifies the declared type of a relation field.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, PathArguments, Type};

/// Container around the related entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Struct { boxed: bool },
    Optional { boxed: bool },
    Slice,
    OptionalSlice,
}

impl Shape {
    /// Matching `::rowbind::RelationKind` variant
    pub fn kind_tokens(self) -> TokenStream {
        match self {
            Shape::Struct { .. } => quote!(::rowbind::RelationKind::Struct),
            Shape::Optional { .. } => quote!(::rowbind::RelationKind::Optional),
            Shape::Slice => quote!(::rowbind::RelationKind::Slice),
            Shape::OptionalSlice => quote!(::rowbind::RelationKind::OptionalSlice),
        }
    }

    pub fn is_singular(self) -> bool {
        matches!(self, Shape::Struct { .. } | Shape::Optional { .. })
    }

    /// Expression turning `rows: Vec<Target>` into the field's value
    pub fn assign_from(self, rows: &syn::Ident) -> TokenStream {
        match self {
            Shape::Struct { boxed: false } => {
                quote!(#rows.into_iter().next().unwrap_or_default())
            }
            Shape::Struct { boxed: true } => {
                quote!(::std::boxed::Box::new(#rows.into_iter().next().unwrap_or_default()))
            }
            Shape::Optional { boxed: false } => quote!(#rows.into_iter().next()),
            Shape::Optional { boxed: true } => {
                quote!(#rows.into_iter().next().map(::std::boxed::Box::new))
            }
            Shape::Slice => quote!(#rows),
            Shape::OptionalSlice => quote!(::core::option::Option::Some(#rows)),
        }
    }

    /// `Option<&Target>` view of a singular relation field
    pub fn borrow_related(self, field: &syn::Ident) -> Option<TokenStream> {
        match self {
            Shape::Struct { boxed: false } => Some(quote!(::core::option::Option::Some(&self.#field))),
            Shape::Struct { boxed: true } => Some(quote!(::core::option::Option::Some(&*self.#field))),
            Shape::Optional { boxed: false } => Some(quote!(self.#field.as_ref())),
            Shape::Optional { boxed: true } => Some(quote!(self.#field.as_deref())),
            Shape::Slice | Shape::OptionalSlice => None,
        }
    }
}

/// Split `ty` into its shape and the related entity type
pub fn analyze(ty: &Type) -> Option<(Shape, Type)> {
    if let Some(inner) = single_generic(ty, "Option") {
        if let Some(target) = single_generic(inner, "Vec") {
            return entity_type(target).map(|t| (Shape::OptionalSlice, t));
        }
        if let Some(target) = single_generic(inner, "Box") {
            return entity_type(target).map(|t| (Shape::Optional { boxed: true }, t));
        }
        return entity_type(inner).map(|t| (Shape::Optional { boxed: false }, t));
    }
    if let Some(target) = single_generic(ty, "Vec") {
        return entity_type(target).map(|t| (Shape::Slice, t));
    }
    if let Some(target) = single_generic(ty, "Box") {
        return entity_type(target).map(|t| (Shape::Struct { boxed: true }, t));
    }
    entity_type(ty).map(|t| (Shape::Struct { boxed: false }, t))
}

/// The only type argument of `ty` when its last segment is `name`
fn single_generic<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// A plain path type without generic arguments
fn entity_type(ty: &Type) -> Option<Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let plain = path
        .path
        .segments
        .iter()
        .all(|segment| segment.arguments.is_none());
    plain.then(|| ty.clone())
}
