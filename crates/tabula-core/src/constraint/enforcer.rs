//! Write validation: referential integrity, required and readonly
//! columns, inheritance chain expansion, and link-table maintenance.
//!
//! The enforcer turns one logical write into a batch of physical ops.
//! Nothing is applied here; callers collect batches in a transaction
//! and hand them to the engine on commit.

use crate::error::{IntegrityError, Result, SchemaError};
use crate::query::{Engine, MatchCondition};
use crate::schema::{Column, ColumnType, SchemaMetadata, TableMetadata};
use crate::security::AccessContext;
use tabula_model::{MrefLink, Row, Value, WriteBatch, WriteOp};
use tracing::debug;

/// Validates logical writes against one schema snapshot and expands
/// them into physical ops.
pub struct ConstraintEnforcer<'a, E: Engine> {
    schema: &'a SchemaMetadata,
    engine: &'a E,
    context: &'a AccessContext,
}

impl<'a, E: Engine> ConstraintEnforcer<'a, E> {
    pub fn new(schema: &'a SchemaMetadata, engine: &'a E, context: &'a AccessContext) -> Self {
        Self {
            schema,
            engine,
            context,
        }
    }

    /// Validate an insert and expand it into one insert per
    /// inheritance level, root first, plus link-table rows.
    pub fn insert(&self, table: &str, row: &Row) -> Result<WriteBatch> {
        self.check_can_edit(table)?;
        let chain = self.schema.inheritance_chain(table)?;
        let columns = self.schema.columns(table)?;
        self.check_known_fields(table, &columns, row)?;

        let mut defaulted = row.clone();
        for &column in &columns {
            self.check_writable_column(table, column, &defaulted, false)?;
            if let (None, Some(default)) =
                (defaulted.get(&column.name), &column.default_value)
            {
                defaulted.set(column.name.clone(), default.clone());
            }
            if !column.nullable
                && !column.is_relationship()
                && value_absent(defaulted.get(&column.name))
            {
                return Err(IntegrityError::RequiredMissing {
                    table: table.to_string(),
                    column: column.name.clone(),
                }
                .into());
            }
        }
        let key = self.key_of(table, &defaulted)?;

        let mut batch = WriteBatch::new();
        let mut links = WriteBatch::new();
        for level in &chain {
            let values = self.level_values(table, level, &defaulted, &key, &mut links, false)?;
            batch.push(WriteOp::Insert {
                table: level.name.clone(),
                values,
            });
        }
        for &column in &columns {
            if column.column_type != ColumnType::Mref {
                self.check_unique(table, column, &defaulted)?;
            }
        }
        batch.extend(links);
        debug!(table, ops = batch.len(), "insert validated");
        Ok(batch)
    }

    /// Validate an update of the row addressed by `key` and expand it
    /// into per-level updates plus link-table rewrites.
    pub fn update(&self, table: &str, key: &Row, changes: &Row) -> Result<WriteBatch> {
        self.check_can_edit(table)?;
        let chain = self.schema.inheritance_chain(table)?;
        let columns = self.schema.columns(table)?;
        self.check_known_fields(table, &columns, changes)?;
        let key = self.key_of(table, key)?;

        for &column in &columns {
            self.check_writable_column(table, column, changes, true)?;
        }

        let mut batch = WriteBatch::new();
        let mut links = WriteBatch::new();
        for level in &chain {
            let values = self.level_values(table, level, changes, &key, &mut links, true)?;
            if !values.is_empty() {
                batch.push(WriteOp::Update {
                    table: level.name.clone(),
                    key: key.clone(),
                    values,
                });
            }
        }
        batch.extend(links);
        debug!(table, ops = batch.len(), "update validated");
        Ok(batch)
    }

    /// Validate a delete: the row must not be referenced anywhere.
    /// Expands into the row's own link-table cleanup plus one delete
    /// per inheritance level, leaf first.
    pub fn delete(&self, table: &str, key: &Row) -> Result<WriteBatch> {
        self.check_can_edit(table)?;
        let chain = self.schema.inheritance_chain(table)?;
        let key = self.key_of(table, key)?;
        self.check_not_referenced(&chain, &key)?;

        let mut batch = WriteBatch::new();
        for column in self.schema.columns(table)? {
            if column.column_type == ColumnType::Mref {
                let link = self.schema.mref_link(table, column)?;
                batch.push(WriteOp::Delete {
                    table: link.table.clone(),
                    key: owner_link_key(&link, &key),
                });
            }
        }
        for level in chain.iter().rev() {
            batch.push(WriteOp::Delete {
                table: level.name.clone(),
                key: key.clone(),
            });
        }
        debug!(table, ops = batch.len(), "delete validated");
        Ok(batch)
    }

    fn check_can_edit(&self, table: &str) -> Result<()> {
        if self.context.is_admin() || self.context.has_role("editor") {
            return Ok(());
        }
        Err(IntegrityError::PermissionDenied {
            table: table.to_string(),
        }
        .into())
    }

    /// Every written field must name a column or a reference component
    /// of the table.
    fn check_known_fields(&self, table: &str, columns: &[&Column], row: &Row) -> Result<()> {
        for path in row.paths() {
            let head = path.split('/').next().unwrap_or(path);
            if !columns.iter().any(|c| c.name == head) {
                return Err(SchemaError::UnknownColumn {
                    table: table.to_string(),
                    column: head.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_writable_column(
        &self,
        table: &str,
        column: &Column,
        row: &Row,
        is_update: bool,
    ) -> Result<()> {
        let touched = row.paths().any(|p| {
            p == column.name || p.starts_with(&format!("{}/", column.name))
        });
        if !touched {
            return Ok(());
        }
        if column.column_type == ColumnType::Refback {
            let via = column.refback_via.clone().unwrap_or_default();
            return Err(IntegrityError::RefbackWrite {
                table: table.to_string(),
                column: column.name.clone(),
                via_table: column.ref_table.clone().unwrap_or_default(),
                via_column: via,
            }
            .into());
        }
        if is_update && column.readonly {
            return Err(IntegrityError::ReadonlyWrite {
                table: table.to_string(),
                column: column.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn check_unique(&self, table: &str, column: &Column, row: &Row) -> Result<()> {
        if !column.unique {
            return Ok(());
        }
        let Some(value) = row.get(&column.name) else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        let count = self.engine.count_matching(
            table,
            &[MatchCondition::equals(column.name.clone(), value.clone())],
        )?;
        if count > 0 {
            return Err(IntegrityError::UniqueViolation {
                table: table.to_string(),
                column: column.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// The full primary key of the row, from the write itself.
    fn key_of(&self, table: &str, row: &Row) -> Result<Row> {
        let mut key = Row::new();
        for pk in self.schema.primary_key(table)? {
            let value = row.get(&pk.name).cloned();
            if value_absent(value.as_ref()) {
                return Err(IntegrityError::RequiredMissing {
                    table: table.to_string(),
                    column: pk.name.clone(),
                }
                .into());
            }
            key.set(pk.name.clone(), value.unwrap_or(Value::Null));
        }
        Ok(key)
    }

    /// Values written to one inheritance level. Reference columns are
    /// checked against the referenced table and expanded to their
    /// physical components; many-to-many columns turn into link rows
    /// collected on `links`.
    fn level_values(
        &self,
        table: &str,
        level: &TableMetadata,
        row: &Row,
        key: &Row,
        links: &mut WriteBatch,
        is_update: bool,
    ) -> Result<Row> {
        let mut values = Row::new();
        for column in &level.columns {
            match column.column_type {
                ColumnType::Refback => {}
                ColumnType::Ref | ColumnType::RefArray => {
                    self.expand_reference(table, column, row, &mut values, is_update)?;
                }
                ColumnType::Mref => {
                    self.expand_mref(table, column, row, key, links, is_update)?;
                }
                _ => {
                    if let Some(value) = row.get(&column.name) {
                        values.set(column.name.clone(), value.clone());
                    }
                }
            }
        }
        // Each level row carries the shared key.
        if !is_update {
            for (path, value) in key.iter() {
                values.set(path.to_string(), value.clone());
            }
        }
        Ok(values)
    }

    fn expand_reference(
        &self,
        table: &str,
        column: &Column,
        row: &Row,
        values: &mut Row,
        is_update: bool,
    ) -> Result<()> {
        let components = self.schema.ref_components(table, column)?;
        let target = column.ref_table.clone().unwrap_or_default();
        let mut present = Vec::new();
        let mut absent = 0usize;
        for component in &components {
            match row.get(&component.name) {
                Some(v) if !v.is_null() => present.push((component, v.clone())),
                _ => absent += 1,
            }
        }
        if present.is_empty() {
            if !column.nullable && !is_update {
                return Err(IntegrityError::RequiredMissing {
                    table: table.to_string(),
                    column: column.name.clone(),
                }
                .into());
            }
            return Ok(());
        }
        if absent > 0 {
            return Err(IntegrityError::PartialKey {
                table: table.to_string(),
                column: column.name.clone(),
            }
            .into());
        }

        let keys = match column.column_type {
            ColumnType::Ref => {
                let key: Row = present
                    .iter()
                    .map(|(c, v)| (c.target_column.clone(), v.clone()))
                    .collect();
                vec![key]
            }
            _ => zip_array_components(table, column, &present)?,
        };
        for key in &keys {
            if !self.engine.exists(&target, key)? {
                return Err(IntegrityError::MissingReference {
                    table: table.to_string(),
                    column: column.name.clone(),
                    target: target.clone(),
                }
                .into());
            }
        }
        for (component, value) in present {
            values.set(component.name.clone(), value);
        }
        Ok(())
    }

    fn expand_mref(
        &self,
        table: &str,
        column: &Column,
        row: &Row,
        key: &Row,
        links: &mut WriteBatch,
        is_update: bool,
    ) -> Result<()> {
        let link = self.schema.mref_link(table, column)?;
        let mut present = Vec::new();
        let mut absent = 0usize;
        for (link_col, target_pk) in &link.target_key {
            match row.get(link_col) {
                Some(v) if !v.is_null() => present.push((link_col, target_pk, v.clone())),
                _ => absent += 1,
            }
        }
        if present.is_empty() {
            if !column.nullable && !is_update {
                return Err(IntegrityError::RequiredMissing {
                    table: table.to_string(),
                    column: column.name.clone(),
                }
                .into());
            }
            return Ok(());
        }
        if absent > 0 {
            return Err(IntegrityError::PartialKey {
                table: table.to_string(),
                column: column.name.clone(),
            }
            .into());
        }

        let lists: Vec<(String, Vec<Value>)> = present
            .iter()
            .map(|(_, pk, v)| ((*pk).clone(), v.clone().into_elements()))
            .collect();
        let len = lists[0].1.len();
        if lists.iter().any(|(_, l)| l.len() != len) {
            return Err(IntegrityError::PartialKey {
                table: table.to_string(),
                column: column.name.clone(),
            }
            .into());
        }

        if is_update {
            links.push(WriteOp::Delete {
                table: link.table.clone(),
                key: owner_link_key(&link, key),
            });
        }
        for i in 0..len {
            let target_key: Row = lists
                .iter()
                .map(|(pk, l)| (pk.clone(), l[i].clone()))
                .collect();
            if !self.engine.exists(&link.target_table, &target_key)? {
                return Err(IntegrityError::MissingReference {
                    table: table.to_string(),
                    column: column.name.clone(),
                    target: link.target_table.clone(),
                }
                .into());
            }
            let mut link_row = owner_link_key(&link, key);
            for ((link_col, _, _), (_, list)) in present.iter().zip(&lists) {
                link_row.set((*link_col).clone(), list[i].clone());
            }
            links.push(WriteOp::Insert {
                table: link.table.clone(),
                values: link_row,
            });
        }
        Ok(())
    }

    /// Reject the delete while any other row still points at this one,
    /// through a reference column or a link table.
    fn check_not_referenced(&self, chain: &[&TableMetadata], key: &Row) -> Result<()> {
        let chain_names: Vec<&str> = chain.iter().map(|t| t.name.as_str()).collect();
        for other in self.schema.tables() {
            for column in self.schema.columns(&other.name)? {
                let target = column.ref_table.as_deref().unwrap_or_default();
                if !column.column_type.is_owned_reference() || !chain_names.contains(&target) {
                    continue;
                }
                let blocked = match column.column_type {
                    ColumnType::Mref => {
                        let link = self.schema.mref_link(&other.name, column)?;
                        let conditions: Vec<MatchCondition> = link
                            .target_key
                            .iter()
                            .map(|(link_col, pk)| {
                                MatchCondition::equals(
                                    link_col.clone(),
                                    key.get(pk).cloned().unwrap_or(Value::Null),
                                )
                            })
                            .collect();
                        self.engine.count_matching(&link.table, &conditions)? > 0
                    }
                    _ => {
                        let pairs: Vec<(String, Value)> = self
                            .schema
                            .ref_components(&other.name, column)?
                            .into_iter()
                            .map(|c| {
                                let value =
                                    key.get(&c.target_column).cloned().unwrap_or(Value::Null);
                                (c.name, value)
                            })
                            .collect();
                        // Array components reference element-wise; the
                        // whole key must match at one index.
                        let conditions: Vec<MatchCondition> =
                            if column.column_type == ColumnType::RefArray {
                                vec![MatchCondition::contains_tuple(pairs)]
                            } else {
                                pairs
                                    .into_iter()
                                    .map(|(column, value)| MatchCondition::equals(column, value))
                                    .collect()
                            };
                        self.engine.count_matching(&other.name, &conditions)? > 0
                    }
                };
                if blocked {
                    return Err(IntegrityError::DeleteBlocked {
                        table: chain[chain.len() - 1].name.clone(),
                        via_table: other.name.clone(),
                        via_column: column.name.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

fn value_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Owner-side columns of a link row for the given owner key.
fn owner_link_key(link: &MrefLink, key: &Row) -> Row {
    link.owner_key
        .iter()
        .map(|(link_col, owner_pk)| {
            (
                link_col.clone(),
                key.get(owner_pk).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

/// Element-wise key rows of a reference array: one per index, all
/// component arrays required to line up.
fn zip_array_components(
    table: &str,
    column: &Column,
    present: &[(&crate::schema::RefComponent, Value)],
) -> Result<Vec<Row>> {
    let lists: Vec<(String, Vec<Value>)> = present
        .iter()
        .map(|(c, v)| (c.target_column.clone(), v.clone().into_elements()))
        .collect();
    let len = lists[0].1.len();
    if lists.iter().any(|(_, l)| l.len() != len) {
        return Err(IntegrityError::PartialKey {
            table: table.to_string(),
            column: column.name.clone(),
        }
        .into());
    }
    Ok((0..len)
        .map(|i| lists.iter().map(|(pk, l)| (pk.clone(), l[i].clone())).collect())
        .collect())
}
