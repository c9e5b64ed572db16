//! Schema / table gate for mutation events.

use std::collections::HashSet;

/// Which events the operator asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Only events from this schema, when set.
    pub schema: Option<String>,
    /// Only events for these tables, when non-empty.
    pub table_allow_list: HashSet<String>,
}

impl FilterSpec {
    pub fn new<I, S>(schema: Option<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.filter(|s| !s.is_empty()),
            table_allow_list: tables
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

/// Admits or rejects mutation events by schema and table.
///
/// Both gates are optional and both must pass. Table map events never go
/// through the filter.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    spec: FilterSpec,
}

impl EventFilter {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn admits_schema(&self, schema: &str) -> bool {
        self.spec.schema.as_deref().map_or(true, |s| s == schema)
    }

    pub fn admits_table(&self, table: &str) -> bool {
        self.spec.table_allow_list.is_empty() || self.spec.table_allow_list.contains(table)
    }

    pub fn admits(&self, schema: &str, table: &str) -> bool {
        self.admits_schema(schema) && self.admits_table(table)
    }
}
