//! Filter compilation: path-addressed conditions to alias-bound
//! predicates, with literal coercion against column types.

use crate::error::{CoercionError, PathError, Result};
use crate::query::join::JoinPlanner;
use crate::query::path;
use crate::schema::{ColumnType, SchemaMetadata};
use chrono::{NaiveDate, NaiveDateTime};
use tabula_model::{Filter, Operator, Predicate, Value};

/// Compiles filter trees for one schema snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'a> {
    schema: &'a SchemaMetadata,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(schema: &'a SchemaMetadata) -> Self {
        Self { schema }
    }

    /// Compile a filter whose paths are relative to `base_table`,
    /// addressed as `base_alias`. Joins needed by the filter are
    /// registered on the planner. Empty branches compile to `None`.
    pub fn compile(
        &self,
        planner: &mut JoinPlanner<'_>,
        base_alias: &str,
        base_table: &str,
        filter: &Filter,
    ) -> Result<Option<Predicate>> {
        match filter {
            Filter::Leaf { path, op, values } => self
                .compile_leaf(planner, base_alias, base_table, path, *op, values)
                .map(Some),
            Filter::And(children) => {
                let compiled = self.compile_children(planner, base_alias, base_table, children)?;
                Ok(match compiled.len() {
                    0 => None,
                    1 => compiled.into_iter().next(),
                    _ => Some(Predicate::And(compiled)),
                })
            }
            Filter::Or(children) => {
                let compiled = self.compile_children(planner, base_alias, base_table, children)?;
                Ok(match compiled.len() {
                    0 => None,
                    1 => compiled.into_iter().next(),
                    _ => Some(Predicate::Or(compiled)),
                })
            }
            Filter::Not(inner) => Ok(self
                .compile(planner, base_alias, base_table, inner)?
                .map(|p| Predicate::Not(Box::new(p)))),
            Filter::Scoped { path, filter } => {
                let resolved = path::resolve(self.schema, base_table, path)?;
                if !resolved.ends_in_relationship() {
                    return Err(PathError::NotARelationship {
                        path: resolved.path.clone(),
                        segment: resolved.leaf().column.name.clone(),
                    }
                    .into());
                }
                let child_table = resolved
                    .leaf()
                    .column
                    .ref_table
                    .clone()
                    .unwrap_or_default();
                let child_alias = planner.register_hops(
                    base_alias,
                    base_table,
                    &resolved.steps,
                    resolved.steps.len(),
                )?;
                self.compile(planner, &child_alias, &child_table, filter)
            }
        }
    }

    fn compile_children(
        &self,
        planner: &mut JoinPlanner<'_>,
        base_alias: &str,
        base_table: &str,
        children: &[Filter],
    ) -> Result<Vec<Predicate>> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            if let Some(p) = self.compile(planner, base_alias, base_table, child)? {
                out.push(p);
            }
        }
        Ok(out)
    }

    fn compile_leaf(
        &self,
        planner: &mut JoinPlanner<'_>,
        base_alias: &str,
        base_table: &str,
        raw_path: &str,
        op: Operator,
        values: &[Value],
    ) -> Result<Predicate> {
        let resolved = path::resolve(self.schema, base_table, raw_path)?;
        let hops = resolved.steps.len() - 1;
        let alias = planner.register_hops(base_alias, base_table, &resolved.steps, hops)?;
        let leaf = resolved.leaf();

        // The overlap operator only applies to array-valued columns.
        if op == Operator::Any
            && !matches!(
                leaf.column.column_type,
                ColumnType::RefArray | ColumnType::Mref
            )
        {
            return Err(CoercionError {
                column: leaf.column.name.clone(),
                expected: "array",
                got: leaf.column.column_type.name(),
            }
            .into());
        }

        if !leaf.column.is_relationship() {
            let coerced = coerce_values(values, leaf.column.column_type, &leaf.column.name)?;
            let alias = planner.owning_alias(&alias, &leaf.table, &leaf.column)?;
            return Ok(Predicate::In {
                alias,
                column: leaf.column.name.clone(),
                values: coerced,
            });
        }

        // Relationship leaf addressed by bare key values. Only
        // single-column target keys can be matched this way.
        let target = leaf.column.ref_table.clone().unwrap_or_default();
        let target_pkey = self.schema.primary_key(&target)?;
        if target_pkey.len() > 1 {
            return Err(PathError::CompositeKeyLeaf {
                path: resolved.path.clone(),
                segment: leaf.column.name.clone(),
            }
            .into());
        }
        let pk_type = target_pkey[0].column_type;
        let coerced = coerce_values(values, pk_type, &leaf.column.name)?;

        match leaf.column.column_type {
            ColumnType::Ref => {
                let components = self.schema.ref_components(&leaf.table, &leaf.column)?;
                let alias = planner.owning_alias(&alias, &leaf.table, &leaf.column)?;
                Ok(Predicate::In {
                    alias,
                    column: components[0].name.clone(),
                    values: coerced,
                })
            }
            ColumnType::RefArray => {
                let components = self.schema.ref_components(&leaf.table, &leaf.column)?;
                let alias = planner.owning_alias(&alias, &leaf.table, &leaf.column)?;
                Ok(Predicate::Overlaps {
                    alias,
                    column: components[0].name.clone(),
                    values: coerced,
                })
            }
            ColumnType::Mref => {
                let link = self.schema.mref_link(&leaf.table, &leaf.column)?;
                Ok(Predicate::MrefOverlaps {
                    alias,
                    link,
                    values: coerced,
                })
            }
            _ => {
                // Refback: match through the joined target instance.
                let child_alias = planner.register_hop(&alias, &leaf.table, &leaf.column)?;
                Ok(Predicate::In {
                    alias: child_alias,
                    column: target_pkey[0].name.clone(),
                    values: coerced,
                })
            }
        }
    }
}

/// Coerce filter literals to a column's type.
///
/// Ints widen to decimals; strings parse to dates, datetimes, and
/// UUIDs. Nulls pass through. Anything else is rejected with the
/// column name, expected type, and offered type.
pub fn coerce_values(
    values: &[Value],
    target: ColumnType,
    column: &str,
) -> Result<Vec<Value>, CoercionError> {
    values
        .iter()
        .map(|v| coerce_value(v, target, column))
        .collect()
}

fn coerce_value(value: &Value, target: ColumnType, column: &str) -> Result<Value, CoercionError> {
    let mismatch = || CoercionError {
        column: column.to_string(),
        expected: target.name(),
        got: value.type_name(),
    };
    if value.is_null() {
        return Ok(Value::Null);
    }
    match (target, value) {
        (ColumnType::String | ColumnType::Text, Value::String(_)) => Ok(value.clone()),
        (ColumnType::Int, Value::Int(_)) => Ok(value.clone()),
        (ColumnType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (ColumnType::Decimal, Value::Decimal(_)) => Ok(value.clone()),
        (ColumnType::Decimal, Value::Int(i)) => Ok(Value::Decimal(*i as f64)),
        (ColumnType::Date, Value::Date(_)) => Ok(value.clone()),
        (ColumnType::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| mismatch()),
        (ColumnType::DateTime, Value::DateTime(_)) => Ok(value.clone()),
        (ColumnType::DateTime, Value::String(s)) => {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .map(Value::DateTime)
                .map_err(|_| mismatch())
        }
        (ColumnType::Uuid, Value::Uuid(_)) => Ok(value.clone()),
        (ColumnType::Uuid, Value::String(s)) => {
            parse_uuid(s).map(Value::Uuid).ok_or_else(mismatch)
        }
        _ => Err(mismatch()),
    }
}

fn parse_uuid(text: &str) -> Option<[u8; 16]> {
    let digits: Vec<u32> = text
        .bytes()
        .filter(|&b| b != b'-')
        .map(|b| (b as char).to_digit(16))
        .collect::<Option<_>>()?;
    if digits.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, pair) in digits.chunks(2).enumerate() {
        out[i] = ((pair[0] << 4) | pair[1]) as u8;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TableMetadata};
    use tabula_model::Filter;

    fn schema() -> SchemaMetadata {
        let mut schema = SchemaMetadata::new("composite");
        schema
            .create_all([
                TableMetadata::new("Person")
                    .with_column(Column::new("firstName", ColumnType::String).pkey())
                    .with_column(Column::new("lastName", ColumnType::String).pkey())
                    .with_column(Column::new("birthDate", ColumnType::Date))
                    .with_column(Column::new("uncle", ColumnType::Ref).references("Person"))
                    .with_column(Column::new("pets", ColumnType::RefArray).references("Pet")),
                TableMetadata::new("Pet")
                    .with_column(Column::new("name", ColumnType::String).pkey())
                    .with_column(Column::new("weight", ColumnType::Decimal)),
            ])
            .unwrap();
        schema
    }

    fn compile(schema: &SchemaMetadata, filter: &Filter) -> Result<Option<Predicate>> {
        let mut planner = JoinPlanner::new(schema, "Person");
        FilterCompiler::new(schema).compile(&mut planner, "Person", "Person", filter)
    }

    #[test]
    fn test_nested_equals_binds_to_hop_alias() {
        let schema = schema();
        let filter = Filter::eq("uncle/lastName", "Duck");
        let predicate = compile(&schema, &filter).unwrap().unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                alias: "Person/uncle".into(),
                column: "lastName".into(),
                values: vec![Value::String("Duck".into())],
            }
        );
    }

    #[test]
    fn test_ref_array_leaf_uses_overlap() {
        let schema = schema();
        let filter = Filter::any("pets", vec![Value::String("pooky".into())]);
        let predicate = compile(&schema, &filter).unwrap().unwrap();
        assert_eq!(
            predicate,
            Predicate::Overlaps {
                alias: "Person".into(),
                column: "pets".into(),
                values: vec![Value::String("pooky".into())],
            }
        );
    }

    #[test]
    fn test_any_rejected_on_scalar_column() {
        let schema = schema();
        let filter = Filter::any("birthDate", vec![Value::String("2005-12-09".into())]);
        let err = compile(&schema, &filter).unwrap_err();
        assert!(err.to_string().contains("birthDate"));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_any_rejected_on_single_ref() {
        let schema = schema();
        let filter = Filter::any("uncle", vec![Value::String("Donald".into())]);
        let err = compile(&schema, &filter).unwrap_err();
        assert!(err.to_string().contains("uncle"));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_composite_key_leaf_rejected() {
        let schema = schema();
        let filter = Filter::eq("uncle", "Donald");
        let err = compile(&schema, &filter).unwrap_err();
        assert!(err.to_string().contains("composite key"));
    }

    #[test]
    fn test_date_string_coerced() {
        let schema = schema();
        let filter = Filter::eq("birthDate", "2005-12-09");
        let predicate = compile(&schema, &filter).unwrap().unwrap();
        let expected = NaiveDate::from_ymd_opt(2005, 12, 9).unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                alias: "Person".into(),
                column: "birthDate".into(),
                values: vec![Value::Date(expected)],
            }
        );
    }

    #[test]
    fn test_coercion_failure_names_column() {
        let schema = schema();
        let filter = Filter::eq("birthDate", "next tuesday");
        let err = compile(&schema, &filter).unwrap_err();
        assert!(err.to_string().contains("birthDate"));
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn test_int_widens_to_decimal() {
        let coerced = coerce_values(&[Value::Int(7)], ColumnType::Decimal, "weight").unwrap();
        assert_eq!(coerced, vec![Value::Decimal(7.0)]);
    }

    #[test]
    fn test_empty_and_compiles_to_none() {
        let schema = schema();
        let filter = Filter::and(vec![Filter::or(vec![])]);
        assert_eq!(compile(&schema, &filter).unwrap(), None);
    }

    #[test]
    fn test_scoped_filter_rebases_paths() {
        let schema = schema();
        let filter = Filter::scoped(
            "pets",
            Filter::and(vec![
                Filter::eq("name", "pooky"),
                Filter::eq("weight", Value::Int(9)),
            ]),
        );
        let predicate = compile(&schema, &filter).unwrap().unwrap();
        match predicate {
            Predicate::And(children) => {
                assert_eq!(
                    children[0],
                    Predicate::In {
                        alias: "Person/pets".into(),
                        column: "name".into(),
                        values: vec![Value::String("pooky".into())],
                    }
                );
                assert_eq!(
                    children[1],
                    Predicate::In {
                        alias: "Person/pets".into(),
                        column: "weight".into(),
                        values: vec![Value::Decimal(9.0)],
                    }
                );
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_uuid() {
        let parsed = parse_uuid("00010203-0405-0607-0809-0a0b0c0d0e0f").unwrap();
        assert_eq!(parsed, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        assert!(parse_uuid("not-a-uuid").is_none());
    }
}
