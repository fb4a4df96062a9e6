//! Schema metadata: the set of tables a compilation runs against.

use super::column::{Column, ColumnType};
use super::table::TableMetadata;
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tabula_model::MrefLink;

/// One physical sub-column of a `Ref`/`RefArray` column.
///
/// A reference to a single-column key reuses the column's own name; a
/// reference to a composite key expands into one sub-column per key
/// part, named `{column}.{key part}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefComponent {
    /// Physical column name on the referencing table.
    pub name: String,
    /// Primary-key column on the referenced table it stores.
    pub target_column: String,
    /// Element type, taken from the referenced key column. `RefArray`
    /// components store arrays of this type.
    pub element_type: ColumnType,
}

/// All tables of one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// Schema name.
    pub name: String,
    tables: Vec<TableMetadata>,
}

impl SchemaMetadata {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    /// Add one table and re-validate the schema.
    pub fn create(&mut self, table: TableMetadata) -> Result<(), SchemaError> {
        self.create_all([table])
    }

    /// Add several tables at once and re-validate the schema.
    ///
    /// Adding as a group allows tables that reference each other to be
    /// defined together; validation runs against the combined set.
    pub fn create_all(
        &mut self,
        tables: impl IntoIterator<Item = TableMetadata>,
    ) -> Result<(), SchemaError> {
        let added: Vec<TableMetadata> = tables.into_iter().collect();
        let rollback = self.tables.len();
        for table in added {
            if self.find(&table.name).is_some() {
                let err = SchemaError::DuplicateTable {
                    table: table.name.clone(),
                };
                self.tables.truncate(rollback);
                return Err(err);
            }
            self.tables.push(table);
        }
        if let Err(err) = self.validate() {
            self.tables.truncate(rollback);
            return Err(err);
        }
        Ok(())
    }

    /// Drop a table. Fails while a surviving table inherits from or
    /// references it.
    pub fn drop(&mut self, name: &str) -> Result<(), SchemaError> {
        self.drop_all([name])
    }

    /// Drop several tables at once.
    ///
    /// References and inheritance between the dropped tables are
    /// allowed, so groups that reference each other come down together
    /// the same way [`create_all`](Self::create_all) brings them up. A
    /// dependency from a surviving table into the group still fails.
    pub fn drop_all<'b>(
        &mut self,
        names: impl IntoIterator<Item = &'b str>,
    ) -> Result<(), SchemaError> {
        let names: Vec<&str> = names.into_iter().collect();
        for name in &names {
            self.table(name)?;
        }
        for other in self.tables.iter().filter(|t| !names.contains(&t.name.as_str())) {
            for name in &names {
                let inherits = other.inherit.as_deref() == Some(*name);
                let references = other
                    .columns
                    .iter()
                    .any(|c| c.is_relationship() && c.ref_table.as_deref() == Some(*name));
                if inherits || references {
                    return Err(SchemaError::TableInUse {
                        table: name.to_string(),
                        via_table: other.name.clone(),
                    });
                }
            }
        }
        self.tables.retain(|t| !names.contains(&t.name.as_str()));
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Result<&TableMetadata, SchemaError> {
        self.find(name).ok_or_else(|| SchemaError::UnknownTable {
            schema: self.name.clone(),
            table: name.to_string(),
        })
    }

    /// Inheritance chain of a table, root table first.
    pub fn inheritance_chain(&self, name: &str) -> Result<Vec<&TableMetadata>, SchemaError> {
        let mut chain = vec![self.table(name)?];
        while let Some(parent) = chain.last().and_then(|t| t.inherit.as_deref()) {
            chain.push(self.table(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }

    /// All columns of a table, inherited ones first, in declaration
    /// order within each level.
    pub fn columns(&self, table: &str) -> Result<Vec<&Column>, SchemaError> {
        Ok(self
            .inheritance_chain(table)?
            .into_iter()
            .flat_map(|t| t.columns.iter())
            .collect())
    }

    /// Look up a column, searching the inheritance chain.
    pub fn column(&self, table: &str, name: &str) -> Result<&Column, SchemaError> {
        self.columns(table)?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    /// Primary-key columns of a table, resolved through the
    /// inheritance chain to the root table.
    pub fn primary_key(&self, table: &str) -> Result<Vec<&Column>, SchemaError> {
        let chain = self.inheritance_chain(table)?;
        let root = chain[0];
        let pkey = root.local_pkey();
        if pkey.is_empty() {
            return Err(SchemaError::MissingKey {
                table: root.name.clone(),
            });
        }
        Ok(pkey)
    }

    /// Whether rows of this table carry a security tag, either declared
    /// on the table itself or inherited from an ancestor.
    pub fn effective_row_security(&self, table: &str) -> Result<bool, SchemaError> {
        Ok(self
            .inheritance_chain(table)?
            .iter()
            .any(|t| t.row_security))
    }

    /// Tables ordered so that inheritance parents and reference targets
    /// come before their dependents. Reference cycles fall back to
    /// declaration order among the remaining tables.
    pub fn tables(&self) -> Vec<&TableMetadata> {
        let index: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();
        let mut deps: Vec<HashSet<usize>> = self
            .tables
            .iter()
            .map(|t| {
                let mut set = HashSet::new();
                if let Some(parent) = t.inherit.as_deref() {
                    if let Some(&i) = index.get(parent) {
                        set.insert(i);
                    }
                }
                for col in &t.columns {
                    if col.column_type.is_owned_reference() {
                        if let Some(&i) = col.ref_table.as_deref().and_then(|r| index.get(r)) {
                            if self.tables[i].name != t.name {
                                set.insert(i);
                            }
                        }
                    }
                }
                set
            })
            .collect();

        let mut ordered = Vec::with_capacity(self.tables.len());
        let mut placed = vec![false; self.tables.len()];
        while ordered.len() < self.tables.len() {
            let next = (0..self.tables.len())
                .find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]))
                // Cycle: take the first unplaced table.
                .or_else(|| (0..self.tables.len()).find(|&i| !placed[i]));
            let Some(i) = next else { break };
            placed[i] = true;
            for set in deps.iter_mut() {
                set.remove(&i);
            }
            ordered.push(&self.tables[i]);
        }
        ordered
    }

    /// Physical sub-columns of a `Ref` or `RefArray` column.
    pub fn ref_components(
        &self,
        table: &str,
        column: &Column,
    ) -> Result<Vec<RefComponent>, SchemaError> {
        let target = column
            .ref_table
            .as_deref()
            .ok_or_else(|| SchemaError::InvalidReference {
                table: table.to_string(),
                column: column.name.clone(),
                reason: "no referenced table set".to_string(),
            })?;
        let pkey = self.primary_key(target)?;
        Ok(pkey
            .iter()
            .map(|pk| RefComponent {
                name: if pkey.len() == 1 {
                    column.name.clone()
                } else {
                    format!("{}.{}", column.name, pk.name)
                },
                target_column: pk.name.clone(),
                element_type: pk.column_type,
            })
            .collect())
    }

    /// Derived link table of an `Mref` column.
    ///
    /// The link table is named `{owner}_{column}`; its owner-side
    /// columns are `{owner}.{key part}` and its target-side columns
    /// follow the same naming as [`ref_components`](Self::ref_components).
    pub fn mref_link(&self, table: &str, column: &Column) -> Result<MrefLink, SchemaError> {
        let target = column
            .ref_table
            .as_deref()
            .ok_or_else(|| SchemaError::InvalidReference {
                table: table.to_string(),
                column: column.name.clone(),
                reason: "no referenced table set".to_string(),
            })?;
        let owner_root = self.inheritance_chain(table)?[0].name.clone();
        let owner_pkey = self.primary_key(table)?;
        let target_pkey = self.primary_key(target)?;
        Ok(MrefLink {
            table: format!("{}_{}", owner_root, column.name),
            owner_table: owner_root.clone(),
            owner_key: owner_pkey
                .iter()
                .map(|pk| (format!("{}.{}", owner_root, pk.name), pk.name.clone()))
                .collect(),
            target_table: target.to_string(),
            target_key: target_pkey
                .iter()
                .map(|pk| {
                    let link_col = if target_pkey.len() == 1 {
                        column.name.clone()
                    } else {
                        format!("{}.{}", column.name, pk.name)
                    };
                    (link_col, pk.name.clone())
                })
                .collect(),
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for table in &self.tables {
            self.validate_inheritance(table)?;
        }
        for table in &self.tables {
            // Chain lookups are safe once inheritance validated.
            let all = self.columns(&table.name)?;
            let mut seen = HashSet::new();
            for col in &all {
                if !seen.insert(col.name.as_str()) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.name.clone(),
                        column: col.name.clone(),
                    });
                }
            }
            if table.inherit.is_none() && table.local_pkey().is_empty() {
                return Err(SchemaError::MissingKey {
                    table: table.name.clone(),
                });
            }
            if table.inherit.is_some() && !table.local_pkey().is_empty() {
                return Err(SchemaError::InvalidInheritance {
                    table: table.name.clone(),
                    parent: table.inherit.clone().unwrap_or_default(),
                    reason: "subtables share the root table's primary key and may not declare their own".to_string(),
                });
            }
            for col in &table.columns {
                self.validate_column(table, col)?;
            }
        }
        Ok(())
    }

    fn validate_inheritance(&self, table: &TableMetadata) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        seen.insert(table.name.as_str());
        let mut current = table;
        while let Some(parent) = current.inherit.as_deref() {
            if !seen.insert(parent) {
                return Err(SchemaError::InvalidInheritance {
                    table: table.name.clone(),
                    parent: parent.to_string(),
                    reason: "inheritance cycle".to_string(),
                });
            }
            current = self.find(parent).ok_or_else(|| SchemaError::InvalidInheritance {
                table: current.name.clone(),
                parent: parent.to_string(),
                reason: "parent table does not exist".to_string(),
            })?;
        }
        Ok(())
    }

    fn validate_column(&self, table: &TableMetadata, col: &Column) -> Result<(), SchemaError> {
        if !col.is_relationship() {
            if col.ref_table.is_some() {
                return Err(SchemaError::InvalidReference {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    reason: format!("{} columns cannot reference a table", col.column_type.name()),
                });
            }
            return Ok(());
        }
        let target = col
            .ref_table
            .as_deref()
            .ok_or_else(|| SchemaError::InvalidReference {
                table: table.name.clone(),
                column: col.name.clone(),
                reason: "relationship column without a referenced table".to_string(),
            })?;
        if self.find(target).is_none() {
            return Err(SchemaError::InvalidReference {
                table: table.name.clone(),
                column: col.name.clone(),
                reason: format!("referenced table '{}' does not exist", target),
            });
        }
        if col.column_type == ColumnType::Refback {
            let via = col
                .refback_via
                .as_deref()
                .ok_or_else(|| SchemaError::InvalidRefback {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    reason: "no mirrored column set".to_string(),
                })?;
            let mirrored = self.column(target, via).map_err(|_| SchemaError::InvalidRefback {
                table: table.name.clone(),
                column: col.name.clone(),
                reason: format!("column '{}' does not exist on table '{}'", via, target),
            })?;
            let mirrors_back = matches!(
                mirrored.column_type,
                ColumnType::Ref | ColumnType::RefArray
            ) && mirrored.ref_table.as_deref() == Some(table.name.as_str());
            if !mirrors_back {
                return Err(SchemaError::InvalidRefback {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    reason: format!(
                        "column '{}.{}' is not a ref or ref_array back to '{}'",
                        target, via, table.name
                    ),
                });
            }
        } else if col.refback_via.is_some() {
            return Err(SchemaError::InvalidReference {
                table: table.name.clone(),
                column: col.name.clone(),
                reason: "only refback columns mirror another column".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_schema() -> SchemaMetadata {
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
                    ),
                TableMetadata::new("Student").inherits("Person"),
            ])
            .unwrap();
        schema
    }

    #[test]
    fn test_lookup_walks_inheritance() {
        let schema = person_schema();
        let col = schema.column("Student", "uncle").unwrap();
        assert_eq!(col.ref_table.as_deref(), Some("Person"));

        let err = schema.column("Student", "nickname").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownColumn {
                table: "Student".into(),
                column: "nickname".into(),
            }
        );
    }

    #[test]
    fn test_subtable_shares_root_key() {
        let schema = person_schema();
        let pkey: Vec<_> = schema
            .primary_key("Student")
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(pkey, vec!["firstName", "lastName"]);
    }

    #[test]
    fn test_composite_ref_components() {
        let schema = person_schema();
        let uncle = schema.column("Person", "uncle").unwrap().clone();
        let components = schema.ref_components("Person", &uncle).unwrap();
        let names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["uncle.firstName", "uncle.lastName"]);
        assert!(components
            .iter()
            .all(|c| c.element_type == ColumnType::String));
    }

    #[test]
    fn test_single_key_ref_component_keeps_column_name() {
        let mut schema = SchemaMetadata::new("pet store");
        schema
            .create_all([
                TableMetadata::new("Category")
                    .with_column(Column::new("name", ColumnType::String).pkey()),
                TableMetadata::new("Pet")
                    .with_column(Column::new("name", ColumnType::String).pkey())
                    .with_column(Column::new("category", ColumnType::Ref).references("Category")),
            ])
            .unwrap();
        let category = schema.column("Pet", "category").unwrap().clone();
        let components = schema.ref_components("Pet", &category).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "category");
        assert_eq!(components[0].target_column, "name");
    }

    #[test]
    fn test_mref_link_naming() {
        let mut schema = SchemaMetadata::new("pet store");
        schema
            .create_all([
                TableMetadata::new("Tag").with_column(Column::new("name", ColumnType::String).pkey()),
                TableMetadata::new("Pet")
                    .with_column(Column::new("name", ColumnType::String).pkey())
                    .with_column(Column::new("tags", ColumnType::Mref).references("Tag")),
            ])
            .unwrap();
        let tags = schema.column("Pet", "tags").unwrap().clone();
        let link = schema.mref_link("Pet", &tags).unwrap();
        assert_eq!(link.table, "Pet_tags");
        assert_eq!(link.owner_key, vec![("Pet.name".to_string(), "name".to_string())]);
        assert_eq!(link.target_key, vec![("tags".to_string(), "name".to_string())]);
    }

    #[test]
    fn test_refback_must_mirror_a_forward_ref() {
        let mut schema = SchemaMetadata::new("bad");
        let err = schema
            .create_all([TableMetadata::new("Person")
                .with_column(Column::new("name", ColumnType::String).pkey())
                .with_column(
                    Column::new("children", ColumnType::Refback).refback("Person", "name"),
                )])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRefback { .. }));
        // Failed create leaves the schema unchanged.
        assert!(schema.table("Person").is_err());
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let mut schema = SchemaMetadata::new("bad");
        let err = schema
            .create_all([
                TableMetadata::new("A")
                    .inherits("B")
                    .with_column(Column::new("x", ColumnType::Int)),
                TableMetadata::new("B")
                    .inherits("A")
                    .with_column(Column::new("y", ColumnType::Int)),
            ])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidInheritance { .. }));
    }

    #[test]
    fn test_drop_blocked_while_referenced() {
        let mut schema = person_schema();
        let err = schema.drop("Person").unwrap_err();
        assert_eq!(
            err,
            SchemaError::TableInUse {
                table: "Person".into(),
                via_table: "Student".into(),
            }
        );
        schema.drop("Student").unwrap();
    }

    #[test]
    fn test_mutually_referencing_tables_drop_as_a_group() {
        let mut schema = SchemaMetadata::new("cyclic");
        schema
            .create_all([
                TableMetadata::new("Order")
                    .with_column(Column::new("id", ColumnType::Int).pkey())
                    .with_column(Column::new("invoice", ColumnType::Ref).references("Invoice")),
                TableMetadata::new("Invoice")
                    .with_column(Column::new("id", ColumnType::Int).pkey())
                    .with_column(Column::new("order", ColumnType::Ref).references("Order")),
            ])
            .unwrap();

        // Neither drops alone, both drop together.
        assert!(matches!(
            schema.drop("Order").unwrap_err(),
            SchemaError::TableInUse { .. }
        ));
        assert!(matches!(
            schema.drop("Invoice").unwrap_err(),
            SchemaError::TableInUse { .. }
        ));
        schema.drop_all(["Order", "Invoice"]).unwrap();
        assert!(schema.table("Order").is_err());
        assert!(schema.table("Invoice").is_err());
    }

    #[test]
    fn test_tables_ordered_targets_first() {
        let mut schema = SchemaMetadata::new("pet store");
        schema
            .create_all([
                TableMetadata::new("Pet")
                    .with_column(Column::new("name", ColumnType::String).pkey())
                    .with_column(Column::new("category", ColumnType::Ref).references("Category")),
                TableMetadata::new("Category")
                    .with_column(Column::new("name", ColumnType::String).pkey()),
            ])
            .unwrap();
        let names: Vec<_> = schema.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Category", "Pet"]);
    }
}
