//! Result assembly: flat join rows back into nested records.
//!
//! A plan with joined relationships fetches one flat row per join
//! combination; the root row repeats once per nested match. Assembly
//! groups rows by each level's key columns, first-seen order preserved,
//! and emits one record per distinct key. Relationship fields are
//! always row sets: an unmatched LEFT join (all-null child key) becomes
//! an empty set, and join fan-out duplicates collapse during grouping.

use crate::error::{Error, Result};
use crate::schema::SchemaMetadata;
use std::collections::HashMap;
use tabula_model::{Nested, QueryPlan, Record, Row, SelectField, Value};

#[derive(Debug)]
enum Entry {
    Field { name: String, output: String },
    Child(usize),
}

#[derive(Debug)]
struct Level {
    name: String,
    entries: Vec<Entry>,
    key_outputs: Vec<String>,
    children: Vec<Level>,
}

/// Assembles flat engine rows into nested records.
#[derive(Debug, Clone, Copy)]
pub struct RowAssembler<'a> {
    schema: &'a SchemaMetadata,
}

impl<'a> RowAssembler<'a> {
    pub fn new(schema: &'a SchemaMetadata) -> Self {
        Self { schema }
    }

    /// Group the fetched rows into records per the plan's select list.
    pub fn assemble(&self, plan: &QueryPlan, rows: &[Row]) -> Result<Vec<Record>> {
        let root = self.build_level(&plan.root_table, "", "", &plan.select)?;
        let refs: Vec<&Row> = rows.iter().collect();
        Ok(self.group(&root, &refs))
    }

    fn build_level(
        &self,
        table: &str,
        name: &str,
        prefix: &str,
        fields: &[SelectField],
    ) -> Result<Level, Error> {
        let mut entries = Vec::new();
        let mut children: Vec<Level> = Vec::new();
        let mut child_index: HashMap<String, usize> = HashMap::new();

        for field in fields {
            let rest = match prefix.is_empty() {
                true => field.output.as_str(),
                false => match field.output.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) {
                    Some(rest) => rest,
                    None => continue,
                },
            };
            match rest.split_once('/') {
                None => entries.push(Entry::Field {
                    name: rest.to_string(),
                    output: field.output.clone(),
                }),
                Some((child, _)) => {
                    if !child_index.contains_key(child) {
                        let column = self.schema.column(table, child)?;
                        let target = column.ref_table.clone().unwrap_or_default();
                        let child_prefix = if prefix.is_empty() {
                            child.to_string()
                        } else {
                            format!("{}/{}", prefix, child)
                        };
                        let level = self.build_level(&target, child, &child_prefix, fields)?;
                        child_index.insert(child.to_string(), children.len());
                        entries.push(Entry::Child(children.len()));
                        children.push(level);
                    }
                }
            }
        }

        let key_outputs = self
            .schema
            .primary_key(table)?
            .into_iter()
            .map(|pk| {
                if prefix.is_empty() {
                    pk.name.clone()
                } else {
                    format!("{}/{}", prefix, pk.name)
                }
            })
            .collect();

        Ok(Level {
            name: name.to_string(),
            entries,
            key_outputs,
            children,
        })
    }

    fn group(&self, level: &Level, rows: &[&Row]) -> Vec<Record> {
        let mut order: Vec<(Vec<&Row>, Vec<Value>)> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let key: Vec<Value> = level
                .key_outputs
                .iter()
                .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            if key.iter().all(Value::is_null) {
                continue;
            }
            let repr =
                serde_json::to_string(&key).unwrap_or_else(|_| format!("{:?}", key));
            match seen.get(&repr) {
                Some(&i) => order[i].0.push(row),
                None => {
                    seen.insert(repr, order.len());
                    order.push((vec![row], key));
                }
            }
        }

        order
            .into_iter()
            .map(|(group_rows, _)| {
                let first = group_rows[0];
                let mut record = Record::new();
                for entry in &level.entries {
                    match entry {
                        Entry::Field { name, output } => {
                            let value = first.get(output).cloned().unwrap_or(Value::Null);
                            record.set(name.clone(), Nested::Value(value));
                        }
                        Entry::Child(i) => {
                            let child = &level.children[*i];
                            record.set(
                                child.name.clone(),
                                Nested::Rows(self.group(child, &group_rows)),
                            );
                        }
                    }
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compiler::QueryCompiler;
    use crate::schema::{Column, ColumnType, TableMetadata};
    use crate::security::AccessContext;
    use tabula_model::{QueryRequest, Select};

    fn schema() -> SchemaMetadata {
        let mut schema = SchemaMetadata::new("composite");
        schema
            .create_all([TableMetadata::new("Person")
                .with_column(Column::new("firstName", ColumnType::String).pkey())
                .with_column(Column::new("lastName", ColumnType::String).pkey())
                .with_column(Column::new("uncle", ColumnType::Ref).references("Person"))
                .with_column(Column::new("cousins", ColumnType::RefArray).references("Person"))])
            .unwrap();
        schema
    }

    fn person_row(first: &str, cousin: Option<&str>) -> Row {
        let mut row = Row::new()
            .with("firstName", Value::String(first.into()))
            .with("lastName", Value::String("Duck".into()));
        match cousin {
            Some(c) => {
                row.set("cousins/firstName", Value::String(c.into()));
                row.set("cousins/lastName", Value::String("Duck".into()));
            }
            None => {
                row.set("cousins/firstName", Value::Null);
                row.set("cousins/lastName", Value::Null);
            }
        }
        row
    }

    fn plan(schema: &SchemaMetadata) -> QueryPlan {
        let request = QueryRequest::new("Person")
            .select_columns(&["firstName", "lastName"])
            .select(Select::new("cousins").with_columns(&["firstName", "lastName"]));
        QueryCompiler::new(schema)
            .compile(&request, &AccessContext::system())
            .unwrap()
    }

    #[test]
    fn test_repeated_root_rows_group_into_one_record() {
        let schema = schema();
        let rows = vec![
            person_row("donald", Some("kwik")),
            person_row("donald", Some("kwek")),
            person_row("scrooge", None),
        ];
        let records = RowAssembler::new(&schema).assemble(&plan(&schema), &rows).unwrap();

        assert_eq!(records.len(), 2);
        let donald = &records[0];
        assert_eq!(
            donald.get("firstName"),
            Some(&Nested::Value(Value::String("donald".into())))
        );
        let cousins = donald.get("cousins").unwrap().as_rows().unwrap();
        assert_eq!(cousins.len(), 2);
        assert_eq!(
            cousins[1].get("firstName"),
            Some(&Nested::Value(Value::String("kwek".into())))
        );
    }

    #[test]
    fn test_unmatched_join_becomes_empty_row_set() {
        let schema = schema();
        let rows = vec![person_row("scrooge", None)];
        let records = RowAssembler::new(&schema).assemble(&plan(&schema), &rows).unwrap();

        assert_eq!(records.len(), 1);
        let cousins = records[0].get("cousins").unwrap().as_rows().unwrap();
        assert!(cousins.is_empty());
    }

    #[test]
    fn test_duplicate_child_rows_collapse() {
        let schema = schema();
        let rows = vec![
            person_row("donald", Some("kwik")),
            person_row("donald", Some("kwik")),
        ];
        let records = RowAssembler::new(&schema).assemble(&plan(&schema), &rows).unwrap();

        assert_eq!(records.len(), 1);
        let cousins = records[0].get("cousins").unwrap().as_rows().unwrap();
        assert_eq!(cousins.len(), 1);
    }

    #[test]
    fn test_single_reference_assembles_as_row_set_of_one() {
        let schema = schema();
        let request = QueryRequest::new("Person")
            .select_columns(&["firstName"])
            .select(Select::new("uncle").with_columns(&["firstName"]));
        let plan = QueryCompiler::new(&schema)
            .compile(&request, &AccessContext::system())
            .unwrap();

        let row = Row::new()
            .with("firstName", Value::String("kwik".into()))
            .with("lastName", Value::String("Duck".into()))
            .with("uncle/firstName", Value::String("donald".into()))
            .with("uncle/lastName", Value::String("Duck".into()));
        let records = RowAssembler::new(&schema).assemble(&plan, &[row]).unwrap();

        let uncle = records[0].get("uncle").unwrap().as_rows().unwrap();
        assert_eq!(uncle.len(), 1);
        assert_eq!(
            uncle[0].get("firstName"),
            Some(&Nested::Value(Value::String("donald".into())))
        );
    }
}
