//! Alias tree and join planning.
//!
//! Every traversed relationship gets one table instance with a
//! deterministic alias: the root table name extended by the column name
//! of each hop, `/`-separated (`Person/uncle/uncle`). Two paths through
//! the same relationship share one instance; the same table reached
//! through different paths gets distinct instances. All joins are LEFT:
//! traversal widens the row, it never narrows the root selection.

use crate::error::{Error, PathError, Result};
use crate::query::path::PathStep;
use crate::schema::{Column, ColumnType, SchemaMetadata};
use std::collections::BTreeMap;
use tabula_model::{Join, JoinKind};

#[derive(Debug, Clone)]
enum AliasEdge {
    /// A traversed relationship column.
    Hop {
        from_alias: String,
        from_table: String,
        column: Column,
    },
    /// An inheritance ancestor of the aliased table, joined on the
    /// shared primary key. Columns declared on an ancestor are stored
    /// in that ancestor's table and must be read through this join.
    Level { from_alias: String, level: String },
}

/// Collects relationship hops and emits the join sequence.
#[derive(Debug)]
pub struct JoinPlanner<'a> {
    schema: &'a SchemaMetadata,
    root_table: String,
    edges: BTreeMap<String, AliasEdge>,
}

impl<'a> JoinPlanner<'a> {
    /// Create a planner rooted at `root_table`. The root alias is the
    /// table name itself.
    pub fn new(schema: &'a SchemaMetadata, root_table: impl Into<String>) -> Self {
        Self {
            schema,
            root_table: root_table.into(),
            edges: BTreeMap::new(),
        }
    }

    /// Root alias.
    pub fn root_alias(&self) -> &str {
        &self.root_table
    }

    /// Register the first `hops` steps of a resolved path as
    /// relationship hops below `base_alias` (a table instance of
    /// `base_table`). Returns the alias reached.
    pub fn register_hops(
        &mut self,
        base_alias: &str,
        base_table: &str,
        steps: &[PathStep],
        hops: usize,
    ) -> Result<String> {
        let mut alias = base_alias.to_string();
        let mut table = base_table.to_string();
        for step in &steps[..hops] {
            alias = self.register_hop(&alias, &table, &step.column)?;
            table = step
                .column
                .ref_table
                .clone()
                .ok_or_else(|| PathError::NotARelationship {
                    path: step.column.name.clone(),
                    segment: step.column.name.clone(),
                })?;
        }
        Ok(alias)
    }

    /// Register a single relationship hop and return the child alias.
    pub fn register_hop(
        &mut self,
        from_alias: &str,
        from_table: &str,
        column: &Column,
    ) -> Result<String> {
        if !column.is_relationship() {
            return Err(PathError::NotARelationship {
                path: column.name.clone(),
                segment: column.name.clone(),
            }
            .into());
        }
        let alias = format!("{}/{}", from_alias, column.name);
        // Forward components are stored in the level declaring the
        // column; back-reference and link joins read only key columns,
        // which every level carries.
        let physical_from = match column.column_type {
            ColumnType::Ref | ColumnType::RefArray => {
                self.owning_alias(from_alias, from_table, column)?
            }
            _ => from_alias.to_string(),
        };
        self.edges.entry(alias.clone()).or_insert_with(|| AliasEdge::Hop {
            from_alias: physical_from,
            from_table: from_table.to_string(),
            column: column.clone(),
        });
        Ok(alias)
    }

    /// Alias holding the physical storage of `column` for the table
    /// instance at `alias`. A column declared on an inheritance
    /// ancestor lives in the ancestor's table, reached through a
    /// key-equality join; key columns exist at every level and stay on
    /// `alias` itself.
    pub fn owning_alias(&mut self, alias: &str, table: &str, column: &Column) -> Result<String> {
        let chain = self.schema.inheritance_chain(table)?;
        if chain.len() == 1 {
            return Ok(alias.to_string());
        }
        if self
            .schema
            .primary_key(table)?
            .iter()
            .any(|pk| pk.name == column.name)
        {
            return Ok(alias.to_string());
        }
        let Some(level) = chain.iter().find(|t| t.local_column(&column.name).is_some()) else {
            return Ok(alias.to_string());
        };
        if level.name == table {
            return Ok(alias.to_string());
        }
        let level_alias = format!("{}#{}", alias, level.name);
        let edge = AliasEdge::Level {
            from_alias: alias.to_string(),
            level: level.name.clone(),
        };
        self.edges.entry(level_alias.clone()).or_insert(edge);
        Ok(level_alias)
    }

    /// All aliases in join order: the root first, then every joined
    /// instance, each after the instance it joins from.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out = vec![self.root_table.as_str()];
        out.extend(self.edges.keys().map(|s| s.as_str()));
        out
    }

    /// Each alias paired with the table it instantiates, in join order.
    /// Derived link-table instances are not listed.
    pub fn alias_tables(&self) -> Vec<(&str, &str)> {
        let mut out = vec![(self.root_table.as_str(), self.root_table.as_str())];
        out.extend(self.edges.iter().map(|(alias, edge)| {
            let table = match edge {
                AliasEdge::Hop { column, .. } => column.ref_table.as_deref().unwrap_or_default(),
                AliasEdge::Level { level, .. } => level.as_str(),
            };
            (alias.as_str(), table)
        }));
        out
    }

    /// Emit the join sequence. Aliases sort lexicographically and both
    /// `#` and `/` extend the base alias, with `#` sorting first, so
    /// every instance comes after its parent and every level instance
    /// comes before the hops that read from it.
    pub fn joins(&self) -> Result<Vec<Join>> {
        let mut joins = Vec::new();
        for (alias, edge) in &self.edges {
            self.emit(alias, edge, &mut joins)?;
        }
        Ok(joins)
    }

    fn emit(&self, alias: &str, edge: &AliasEdge, joins: &mut Vec<Join>) -> Result<(), Error> {
        let (from_alias, from_table, column) = match edge {
            AliasEdge::Level { from_alias, level } => {
                let on = self
                    .schema
                    .primary_key(level)?
                    .iter()
                    .map(|pk| (pk.name.clone(), pk.name.clone()))
                    .collect();
                joins.push(Join {
                    table: level.clone(),
                    alias: alias.to_string(),
                    from_alias: from_alias.clone(),
                    kind: JoinKind::Ref { on },
                });
                return Ok(());
            }
            AliasEdge::Hop {
                from_alias,
                from_table,
                column,
            } => (from_alias, from_table, column),
        };
        let target = column.ref_table.clone().unwrap_or_default();
        match column.column_type {
            ColumnType::Ref | ColumnType::RefArray => {
                let components = self.schema.ref_components(from_table, column)?;
                let on: Vec<(String, String)> = components
                    .into_iter()
                    .map(|c| (c.name, c.target_column))
                    .collect();
                let kind = if column.column_type == ColumnType::Ref {
                    JoinKind::Ref { on }
                } else {
                    JoinKind::RefArray { on }
                };
                joins.push(Join {
                    table: target,
                    alias: alias.to_string(),
                    from_alias: from_alias.clone(),
                    kind,
                });
            }
            ColumnType::Mref => {
                let link = self.schema.mref_link(from_table, column)?;
                let link_alias = format!("{}#link", alias);
                joins.push(Join {
                    table: link.table.clone(),
                    alias: link_alias.clone(),
                    from_alias: from_alias.clone(),
                    kind: JoinKind::Ref {
                        on: link
                            .owner_key
                            .iter()
                            .map(|(link_col, owner_pk)| (owner_pk.clone(), link_col.clone()))
                            .collect(),
                    },
                });
                joins.push(Join {
                    table: link.target_table.clone(),
                    alias: alias.to_string(),
                    from_alias: link_alias,
                    kind: JoinKind::Ref {
                        on: link.target_key.clone(),
                    },
                });
            }
            ColumnType::Refback => {
                // Mirror the forward column declared on the target.
                let via = column.refback_via.as_deref().unwrap_or_default();
                let mirrored = self.schema.column(&target, via)?.clone();
                let components = self.schema.ref_components(&target, &mirrored)?;
                let on: Vec<(String, String)> = components
                    .into_iter()
                    .map(|c| (c.target_column, c.name))
                    .collect();
                let kind = match mirrored.column_type {
                    ColumnType::RefArray => JoinKind::RefbackArray { on },
                    _ => JoinKind::Ref { on },
                };
                joins.push(Join {
                    table: target,
                    alias: alias.to_string(),
                    from_alias: from_alias.clone(),
                    kind,
                });
            }
            _ => {
                return Err(PathError::NotARelationship {
                    path: column.name.clone(),
                    segment: column.name.clone(),
                }
                .into())
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::path;
    use crate::schema::TableMetadata;

    fn schema() -> SchemaMetadata {
        let mut schema = SchemaMetadata::new("composite");
        schema
            .create_all([
                TableMetadata::new("Person")
                    .with_column(Column::new("firstName", ColumnType::String).pkey())
                    .with_column(Column::new("lastName", ColumnType::String).pkey())
                    .with_column(Column::new("uncle", ColumnType::Ref).references("Person"))
                    .with_column(Column::new("cousins", ColumnType::RefArray).references("Person"))
                    .with_column(
                        Column::new("nephews", ColumnType::Refback).refback("Person", "uncle"),
                    )
                    .with_column(Column::new("tags", ColumnType::Mref).references("Tag")),
                TableMetadata::new("Tag").with_column(Column::new("name", ColumnType::String).pkey()),
                TableMetadata::new("Student").inherits("Person"),
            ])
            .unwrap();
        schema
    }

    #[test]
    fn test_shared_prefix_joins_once() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Person");
        let a = path::resolve(&schema, "Person", "uncle/firstName").unwrap();
        let b = path::resolve(&schema, "Person", "uncle/lastName").unwrap();
        planner.register_hops("Person", "Person", &a.steps, 1).unwrap();
        planner.register_hops("Person", "Person", &b.steps, 1).unwrap();

        let joins = planner.joins().unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].alias, "Person/uncle");
        assert_eq!(
            joins[0].kind,
            JoinKind::Ref {
                on: vec![
                    ("uncle.firstName".into(), "firstName".into()),
                    ("uncle.lastName".into(), "lastName".into()),
                ]
            }
        );
    }

    #[test]
    fn test_nested_hops_emit_in_prefix_order() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Person");
        let p = path::resolve(&schema, "Person", "uncle/cousins/lastName").unwrap();
        planner.register_hops("Person", "Person", &p.steps, 2).unwrap();

        let joins = planner.joins().unwrap();
        let aliases: Vec<_> = joins.iter().map(|j| j.alias.as_str()).collect();
        assert_eq!(aliases, vec!["Person/uncle", "Person/uncle/cousins"]);
        assert_eq!(joins[1].from_alias, "Person/uncle");
        assert!(matches!(joins[1].kind, JoinKind::RefArray { .. }));
    }

    #[test]
    fn test_mref_joins_through_link_table() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Person");
        let p = path::resolve(&schema, "Person", "tags/name").unwrap();
        planner.register_hops("Person", "Person", &p.steps, 1).unwrap();

        let joins = planner.joins().unwrap();
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].table, "Person_tags");
        assert_eq!(joins[0].alias, "Person/tags#link");
        assert_eq!(joins[0].from_alias, "Person");
        assert_eq!(joins[1].alias, "Person/tags");
        assert_eq!(joins[1].from_alias, "Person/tags#link");
    }

    #[test]
    fn test_inherited_fk_joins_from_parent_level() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Student");
        let p = path::resolve(&schema, "Student", "uncle/firstName").unwrap();
        planner.register_hops("Student", "Student", &p.steps, 1).unwrap();

        let joins = planner.joins().unwrap();
        assert_eq!(joins.len(), 2);
        // The level join comes first and carries the shared key.
        assert_eq!(joins[0].table, "Person");
        assert_eq!(joins[0].alias, "Student#Person");
        assert_eq!(joins[0].from_alias, "Student");
        assert_eq!(
            joins[0].kind,
            JoinKind::Ref {
                on: vec![
                    ("firstName".into(), "firstName".into()),
                    ("lastName".into(), "lastName".into()),
                ]
            }
        );
        // The hop reads its components from the level that stores them.
        assert_eq!(joins[1].alias, "Student/uncle");
        assert_eq!(joins[1].from_alias, "Student#Person");
    }

    #[test]
    fn test_owning_alias_keeps_key_columns_on_the_instance() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Student");
        let key = schema.column("Student", "firstName").unwrap().clone();
        let alias = planner.owning_alias("Student", "Student", &key).unwrap();
        assert_eq!(alias, "Student");
        assert!(planner.joins().unwrap().is_empty());
    }

    #[test]
    fn test_refback_mirrors_forward_ref() {
        let schema = schema();
        let mut planner = JoinPlanner::new(&schema, "Person");
        let p = path::resolve(&schema, "Person", "nephews/firstName").unwrap();
        planner.register_hops("Person", "Person", &p.steps, 1).unwrap();

        let joins = planner.joins().unwrap();
        assert_eq!(joins.len(), 1);
        // Reversed: the joined side holds the forward components.
        assert_eq!(
            joins[0].kind,
            JoinKind::Ref {
                on: vec![
                    ("firstName".into(), "uncle.firstName".into()),
                    ("lastName".into(), "uncle.lastName".into()),
                ]
            }
        );
    }
}
