#![crate_type = "proc-macro"]

extern crate proc_macro;
mod entity;
mod errors;
mod primary_key;

use proc_macro::TokenStream;

/// Derive `rowbind::Entity` from `#[rowbind(...)]` annotations.
///
/// ```ignore
/// #[derive(Default, rowbind::Entity)]
/// #[rowbind(depth = 2)]
/// pub struct User {
///     #[rowbind(column = "id", primary_key)]
///     pub user_id: i64,
///     #[rowbind(column = "group_id", reference = "my_group.id")]
///     pub group_id: Option<i64>,
///     #[rowbind(relation = "id = ?", params = "group_id")]
///     pub my_group: Option<Box<Group>>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(rowbind))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input: proc_macro2::TokenStream = input.into();
    entity::generate_entity_impl(input).into()
}
