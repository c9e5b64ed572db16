//! Equality clause building.
//!
//! Produces `` `col1`=v1 AND `col2`=v2 `` from column names and a row image.
//! The same shape is used for SET lists and WHERE predicates.

use std::collections::HashSet;

/// Where a clause is going to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// Every column, in order.
    Set,
    /// Primary key columns only, or every column when the table has no
    /// primary key.
    Where,
}

/// Render one value as a SQL literal.
///
/// The text is emitted bare only when it parses entirely as a base-10
/// integer; anything else is wrapped in single quotes. This means floats,
/// `NULL` and digit-only text columns are not rendered faithfully.
pub fn render_value(value: &str) -> String {
    if value.parse::<i64>().is_ok() {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}

/// Build a clause over `columns` zipped with `values`.
///
/// Returns `None` when no column qualifies, which callers treat as an
/// invariant violation.
pub fn build(
    columns: &[String],
    values: &[String],
    primary_key: &HashSet<String>,
    clause: Clause,
) -> Option<String> {
    let key_only = clause == Clause::Where && !primary_key.is_empty();

    let parts: Vec<String> = columns
        .iter()
        .zip(values)
        .filter(|(column, _)| !key_only || primary_key.contains(*column))
        .map(|(column, value)| format!("`{column}`={}", render_value(value)))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}
