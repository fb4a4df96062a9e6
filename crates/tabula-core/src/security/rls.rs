//! Row-level security predicate injection.
//!
//! Tables flagged for row security carry a role tag on each row (the
//! [`ROW_ROLE_COLUMN`] array column). During compilation every table
//! instance of such a table gets a visibility predicate AND-combined
//! into the plan, so hidden rows never reach the caller, not even
//! through a joined relationship. Admin contexts skip injection.

use crate::error::Result;
use crate::schema::SchemaMetadata;
use crate::security::AccessContext;
use tabula_model::Predicate;
use tracing::debug;

/// Build the visibility predicate for the given table instances.
///
/// `alias_tables` pairs each alias in the plan with the table it
/// instantiates. Returns `None` when no instance needs a check.
pub fn visibility_predicate(
    schema: &SchemaMetadata,
    alias_tables: &[(&str, &str)],
    context: &AccessContext,
) -> Result<Option<Predicate>> {
    if context.is_admin() {
        return Ok(None);
    }
    let roles = context.roles();
    let mut checks = Vec::new();
    for (alias, table) in alias_tables {
        if schema.effective_row_security(table)? {
            debug!(alias, table, "row security check injected");
            checks.push(Predicate::RoleVisible {
                alias: alias.to_string(),
                roles: roles.clone(),
            });
        }
    }
    Ok(match checks.len() {
        0 => None,
        1 => checks.into_iter().next(),
        _ => Some(Predicate::And(checks)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType, TableMetadata};

    fn schema() -> SchemaMetadata {
        let mut schema = SchemaMetadata::new("rls");
        schema
            .create_all([
                TableMetadata::new("Order")
                    .with_column(Column::new("id", ColumnType::Int).pkey())
                    .with_row_security(),
                TableMetadata::new("Archive").inherits("Order"),
                TableMetadata::new("Public")
                    .with_column(Column::new("id", ColumnType::Int).pkey()),
            ])
            .unwrap();
        schema
    }

    #[test]
    fn test_viewer_gets_check_per_secured_instance() {
        let schema = schema();
        let ctx = AccessContext::with_roles(["viewer".into()]);
        let predicate = visibility_predicate(
            &schema,
            &[("Order", "Order"), ("Order/buyer", "Public")],
            &ctx,
        )
        .unwrap();
        assert_eq!(
            predicate,
            Some(Predicate::RoleVisible {
                alias: "Order".into(),
                roles: vec!["viewer".into()],
            })
        );
    }

    #[test]
    fn test_row_security_inherited_by_subtables() {
        let schema = schema();
        let ctx = AccessContext::anonymous();
        let predicate =
            visibility_predicate(&schema, &[("Archive", "Archive")], &ctx).unwrap();
        assert!(predicate.is_some());
    }

    #[test]
    fn test_admin_bypasses_injection() {
        let schema = schema();
        let predicate =
            visibility_predicate(&schema, &[("Order", "Order")], &AccessContext::system())
                .unwrap();
        assert_eq!(predicate, None);
    }
}
