//! Entity descriptor construction.
//!
//! A descriptor is derived once per type from its [`EntityMetadata`] and is
//! read-only afterwards. Column order is declaration order and is shared by
//! the select projection, the row scanner and insert arguments.

use std::collections::HashMap;

use heck::ToSnakeCase;

use crate::entity_metadata::{EntityMetadata, FieldMeta};
use crate::types::{RelationKind, RowbindError, RowbindResult};

/// Recursion budget used when neither the type nor the caller sets one
pub const DEFAULT_DEPTH: u32 = 2;

/// A persisted column and the field it binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub field: &'static str,
    pub reference: Option<Reference>,
}

/// `<relation>.<field>`: on writes the column takes the related entity's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub relation: &'static str,
    pub field: &'static str,
}

/// Raw relation annotation of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationField {
    pub field: &'static str,
    pub fragment: &'static str,
    pub params: Vec<&'static str>,
    pub kind: RelationKind,
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    type_name: &'static str,
    table: String,
    columns: Vec<ColumnDef>,
    column_to_field: HashMap<&'static str, &'static str>,
    primary_key: usize,
    relations: Vec<RelationField>,
    default_depth: u32,
}

impl EntityDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn field_for_column(&self, column: &str) -> Option<&'static str> {
        self.column_to_field.get(column).copied()
    }

    pub fn primary_key(&self) -> &ColumnDef {
        &self.columns[self.primary_key]
    }

    /// Columns other than the primary key, in descriptor order
    pub fn non_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        let pk = self.primary_key;
        self.columns
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != pk)
            .map(|(_, c)| c)
    }

    pub fn relations(&self) -> &[RelationField] {
        &self.relations
    }

    pub fn default_depth(&self) -> u32 {
        self.default_depth
    }
}

pub struct DescriptorBuilder;

impl DescriptorBuilder {
    pub fn build(meta: &EntityMetadata) -> RowbindResult<EntityDescriptor> {
        let entity = meta.type_name;
        let table = resolve_table_name(meta);

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut column_to_field = HashMap::new();
        let mut marked_pk: Option<usize> = None;
        let mut relations = Vec::new();

        for field in meta.fields {
            if let Some(column) = field.column {
                if column_to_field.insert(column, field.name).is_some() {
                    return Err(RowbindError::DuplicateColumn {
                        entity: entity.to_string(),
                        column: column.to_string(),
                    });
                }
                if field.primary_key {
                    if let Some(first) = marked_pk {
                        return Err(RowbindError::MultiplePrimaryKeys {
                            entity: entity.to_string(),
                            first: columns[first].field.to_string(),
                            second: field.name.to_string(),
                        });
                    }
                    marked_pk = Some(columns.len());
                }
                columns.push(ColumnDef {
                    name: column,
                    field: field.name,
                    reference: parse_reference(entity, field)?,
                });
            } else if field.primary_key {
                return Err(RowbindError::invalid_annotation(
                    entity,
                    field.name,
                    "primary key field has no column",
                ));
            }

            if let Some(fragment) = field.relation {
                let kind = field.relation_kind.ok_or_else(|| {
                    RowbindError::invalid_annotation(entity, field.name, "relation kind is missing")
                })?;
                relations.push(RelationField {
                    field: field.name,
                    fragment,
                    params: parse_params(field.relation_params),
                    kind,
                });
            }
        }

        if columns.is_empty() {
            return Err(RowbindError::EmptyDescriptor {
                entity: entity.to_string(),
            });
        }

        let primary_key = marked_pk
            .or_else(|| columns.iter().position(|c| c.field == "id"))
            .ok_or_else(|| RowbindError::NoPrimaryKey {
                entity: entity.to_string(),
            })?;

        for column in &columns {
            if let Some(reference) = column.reference {
                let known = meta.fields.iter().any(|f| f.name == reference.relation);
                if !known {
                    return Err(RowbindError::invalid_annotation(
                        entity,
                        column.field,
                        format!("reference names unknown field '{}'", reference.relation),
                    ));
                }
            }
        }

        Ok(EntityDescriptor {
            type_name: entity,
            table,
            columns,
            column_to_field,
            primary_key,
            relations,
            default_depth: meta.default_depth.unwrap_or(DEFAULT_DEPTH),
        })
    }
}

/// Struct-level override, then the first field-level override, then snake_case of the type name
pub fn resolve_table_name(meta: &EntityMetadata) -> String {
    if let Some(table) = meta.table {
        return table.to_string();
    }
    if let Some(table) = meta.fields.iter().find_map(|f| f.table_override) {
        return table.to_string();
    }
    meta.type_name.to_snake_case()
}

fn parse_params(params: Option<&'static str>) -> Vec<&'static str> {
    params
        .map(|p| {
            p.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_reference(entity: &str, field: &FieldMeta) -> RowbindResult<Option<Reference>> {
    let Some(raw) = field.reference else {
        return Ok(None);
    };
    match raw.split_once('.') {
        Some((relation, target)) if !relation.trim().is_empty() && !target.trim().is_empty() => {
            Ok(Some(Reference {
                relation: relation.trim(),
                field: target.trim(),
            }))
        }
        _ => Err(RowbindError::invalid_annotation(
            entity,
            field.name,
            format!("reference '{}' must read <relation>.<field>", raw),
        )),
    }
}
