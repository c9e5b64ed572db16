//! Table metadata cache.
//!
//! Row events identify tables by a numeric id announced in a preceding
//! table map event. On every table map event the cache asks the schema
//! catalog for the table's current column order and primary key and replaces
//! whatever it held for that id, so schema changes mid-stream are picked up.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::{ColumnInfo, TableMetadata};

/// Source of truth for column layout.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Columns of `schema.table` in ordinal order.
    async fn columns(&self, schema: &str, table: &str) -> AnyResult<Vec<ColumnInfo>>;
}

/// Per-run metadata, keyed by the source's table id.
#[derive(Debug, Default)]
pub struct TableMetadataCache {
    tables: HashMap<u64, TableMetadata>,
}

impl TableMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the catalog and replace the entry for `table_id`.
    ///
    /// A catalog failure is returned as-is; the caller aborts the run rather
    /// than translate with stale metadata.
    pub async fn refresh<K: SchemaCatalog + ?Sized>(
        &mut self,
        catalog: &K,
        table_id: u64,
        schema: &str,
        table: &str,
    ) -> Result<&TableMetadata> {
        let columns =
            catalog
                .columns(schema, table)
                .await
                .map_err(|source| EngineError::Catalog {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    source,
                })?;

        if columns.is_empty() {
            return Err(EngineError::EmptyTable {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }

        let meta = TableMetadata::from_columns(schema, table, columns);
        debug!(
            "Table id {} -> {} ({} columns, primary key: {:?})",
            table_id,
            meta.qualified_name(),
            meta.columns.len(),
            meta.primary_key
        );

        match self.tables.entry(table_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(meta);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(meta)),
        }
    }

    pub fn get(&self, table_id: u64) -> Option<&TableMetadata> {
        self.tables.get(&table_id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
