//! Path expressions resolved against schema metadata.
//!
//! A path addresses a column through zero or more relationship hops,
//! e.g. `uncle/lastName` from a `Person` root. Segments separate with
//! `/`; `.` is accepted and normalized. Every intermediate segment must
//! be a relationship column; resolution errors name the exact segment
//! and the table it was looked up on.

use crate::error::PathError;
use crate::schema::{Column, SchemaMetadata};
use tabula_model::normalize_path;

/// One resolved segment: the table it was looked up on and the column
/// it named.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    /// Table the segment was resolved on.
    pub table: String,
    /// The named column.
    pub column: Column,
}

/// A fully resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Path as given, normalized to `/` separators.
    pub path: String,
    /// One step per segment.
    pub steps: Vec<PathStep>,
}

impl ResolvedPath {
    /// The final step.
    pub fn leaf(&self) -> &PathStep {
        // Resolution rejects empty paths, steps is never empty.
        &self.steps[self.steps.len() - 1]
    }

    /// Alias of the table instance the leaf column lives on: the root
    /// alias extended by every intermediate relationship segment.
    pub fn leaf_alias(&self, root_alias: &str) -> String {
        self.steps[..self.steps.len() - 1]
            .iter()
            .fold(root_alias.to_string(), |alias, step| {
                format!("{}/{}", alias, step.column.name)
            })
    }

    /// Alias of the table instance the leaf points INTO. Only
    /// meaningful when the leaf is a relationship column.
    pub fn target_alias(&self, root_alias: &str) -> String {
        format!("{}/{}", self.leaf_alias(root_alias), self.leaf().column.name)
    }

    /// Whether the leaf is a relationship column.
    pub fn ends_in_relationship(&self) -> bool {
        self.leaf().column.is_relationship()
    }
}

/// Resolve a path expression starting at `table`.
pub fn resolve(
    schema: &SchemaMetadata,
    table: &str,
    path: &str,
) -> Result<ResolvedPath, PathError> {
    let path = normalize_path(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    let mut steps = Vec::with_capacity(segments.len());
    let mut current = table.to_string();
    for (i, segment) in segments.iter().enumerate() {
        let column = schema
            .column(&current, segment)
            .map_err(|_| PathError::UnknownSegment {
                path: path.clone(),
                table: current.clone(),
                segment: segment.to_string(),
            })?
            .clone();
        let resolved_on = current.clone();
        if i < segments.len() - 1 {
            current = column
                .ref_table
                .clone()
                .filter(|_| column.is_relationship())
                .ok_or_else(|| PathError::NotARelationship {
                    path: path.clone(),
                    segment: segment.to_string(),
                })?;
        }
        steps.push(PathStep {
            table: resolved_on,
            column,
        });
    }

    Ok(ResolvedPath { path, steps })
}
