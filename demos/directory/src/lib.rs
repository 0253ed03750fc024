//! Users, roles and groups mapped with `rowbind`, on SQLite.

pub mod entities;
pub mod schema;

pub use entities::{Group, Role, User, UserRole};
pub use schema::open;
