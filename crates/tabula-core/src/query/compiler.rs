//! Request-to-plan compilation.
//!
//! [`QueryCompiler::compile`] turns one request into one complete plan:
//! select expansion with deterministic aliases, one LEFT join per
//! traversed relationship, filter and search compilation, and
//! row-security injection, all against an immutable schema snapshot.

use crate::error::{PathError, Result};
use crate::query::filter::FilterCompiler;
use crate::query::join::JoinPlanner;
use crate::query::path;
use crate::schema::SchemaMetadata;
use crate::security::{visibility_predicate, AccessContext};
use tabula_model::{
    OrderField, Predicate, QueryPlan, QueryRequest, Select, SelectField,
};
use tracing::debug;

fn output_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Compiles query requests against one schema snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    schema: &'a SchemaMetadata,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(schema: &'a SchemaMetadata) -> Self {
        Self { schema }
    }

    /// Compile a request into an engine-ready plan.
    ///
    /// The select list always includes every traversed level's key
    /// columns; result assembly groups nested rows by them. An empty
    /// select means all columns of the root table except derived
    /// back-references, with relationships projected as their keys.
    pub fn compile(&self, request: &QueryRequest, context: &AccessContext) -> Result<QueryPlan> {
        let root = self.schema.table(&request.table)?;
        let mut planner = JoinPlanner::new(self.schema, root.name.clone());

        let selects = if request.select.is_empty() {
            self.default_select(&root.name)?
        } else {
            request.select.clone()
        };
        let mut fields = Vec::new();
        let root_alias = planner.root_alias().to_string();
        self.expand_level(&mut planner, &root_alias, &root.name, "", &selects, &mut fields)?;

        let filter_predicate = match &request.filter {
            Some(filter) => FilterCompiler::new(self.schema).compile(
                &mut planner,
                &root_alias,
                &root.name,
                filter,
            )?,
            None => None,
        };

        let order_by = self.resolve_order(&mut planner, &root.name, request)?;
        // Search spans every joined instance, so it is built only after
        // filters and ordering have registered their hops.
        let search_predicate = self.search_predicate(&planner, &request.search);
        let security_predicate =
            visibility_predicate(self.schema, &planner.alias_tables(), context)?;

        let predicate = Predicate::combine(
            Predicate::combine(filter_predicate, search_predicate),
            security_predicate,
        );
        let joins = planner.joins()?;
        debug!(
            table = %root.name,
            fields = fields.len(),
            joins = joins.len(),
            "query compiled"
        );

        Ok(QueryPlan {
            schema: self.schema.name.clone(),
            root_table: root.name.clone(),
            select: fields,
            joins,
            predicate,
            order_by,
            limit: request.limit,
            offset: request.offset,
        })
    }

    /// All columns of the table except derived back-references.
    fn default_select(&self, table: &str) -> Result<Vec<Select>> {
        Ok(self
            .schema
            .columns(table)?
            .into_iter()
            .filter(|c| c.refback_via.is_none())
            .map(|c| Select::new(c.name.clone()))
            .collect())
    }

    fn expand_level(
        &self,
        planner: &mut JoinPlanner<'_>,
        alias: &str,
        table: &str,
        prefix: &str,
        selects: &[Select],
        out: &mut Vec<SelectField>,
    ) -> Result<()> {
        for select in selects {
            let column = self.schema.column(table, &select.column)?.clone();
            let output = output_path(prefix, &column.name);
            if !column.is_relationship() {
                if select.is_nested() {
                    return Err(PathError::NotARelationship {
                        path: output,
                        segment: column.name.clone(),
                    }
                    .into());
                }
                let field_alias = planner.owning_alias(alias, table, &column)?;
                out.push(SelectField {
                    alias: field_alias,
                    column: column.name.clone(),
                    output,
                });
                continue;
            }
            let target = column.ref_table.clone().unwrap_or_default();
            let child_alias = planner.register_hop(alias, table, &column)?;
            let children = if select.children.is_empty() {
                // Bare relationship select projects the target's key.
                self.schema
                    .primary_key(&target)?
                    .into_iter()
                    .map(|pk| Select::new(pk.name.clone()))
                    .collect()
            } else {
                select.children.clone()
            };
            self.expand_level(planner, &child_alias, &target, &output, &children, out)?;
        }

        // Grouping during assembly needs each level's key.
        for pk in self.schema.primary_key(table)? {
            let output = output_path(prefix, &pk.name);
            if !out.iter().any(|f| f.output == output) {
                out.push(SelectField {
                    alias: alias.to_string(),
                    column: pk.name.clone(),
                    output,
                });
            }
        }
        Ok(())
    }

    /// Full-text search matches when any table instance matches; the
    /// terms run against each instance's search vector column.
    fn search_predicate(&self, planner: &JoinPlanner<'_>, terms: &[String]) -> Option<Predicate> {
        if terms.is_empty() {
            return None;
        }
        let matches: Vec<Predicate> = planner
            .aliases()
            .into_iter()
            .map(|alias| Predicate::SearchMatches {
                alias: alias.to_string(),
                terms: terms.to_vec(),
            })
            .collect();
        match matches.len() {
            1 => matches.into_iter().next(),
            _ => Some(Predicate::Or(matches)),
        }
    }

    fn resolve_order(
        &self,
        planner: &mut JoinPlanner<'_>,
        root_table: &str,
        request: &QueryRequest,
    ) -> Result<Vec<OrderField>> {
        let root_alias = planner.root_alias().to_string();
        request
            .order_by
            .iter()
            .map(|spec| {
                let resolved = path::resolve(self.schema, root_table, &spec.path)?;
                if resolved.ends_in_relationship() {
                    return Err(PathError::NotARelationship {
                        path: resolved.path.clone(),
                        segment: resolved.leaf().column.name.clone(),
                    }
                    .into());
                }
                let hops = resolved.steps.len() - 1;
                let alias =
                    planner.register_hops(&root_alias, root_table, &resolved.steps, hops)?;
                let leaf = resolved.leaf();
                let alias = planner.owning_alias(&alias, &leaf.table, &leaf.column)?;
                Ok(OrderField {
                    alias,
                    column: leaf.column.name.clone(),
                    direction: spec.direction,
                })
            })
            .collect()
    }
}
