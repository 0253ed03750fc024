pub mod config;
pub mod context;
pub mod descriptor;
pub mod entity_metadata;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod scanner;
pub mod statements;
pub mod types;

pub use self::config::EngineConfig;
pub use context::{begin_shared, BindContext, ExecOutcome, ExecutionContext, Transaction};
pub use descriptor::{ColumnDef, DescriptorBuilder, EntityDescriptor, Reference, RelationField, DEFAULT_DEPTH};
pub use entity_metadata::{Entity, EntityMetadata, FieldMeta};
pub use query::QueryPlan;
pub use repository::Repository;
pub use resolver::RelationDescriptor;
pub use scanner::ScanRow;
pub use statements::Statements;
pub use types::*;

// Derive macro and the crates its generated code names
pub use rowbind_macros::Entity;
pub use once_cell;
pub use sea_orm;
pub use tokio_util::sync::CancellationToken;
