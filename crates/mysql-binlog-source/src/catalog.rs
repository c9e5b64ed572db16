//! Column layout lookup from `INFORMATION_SCHEMA`
//!
//! Binlog row images carry values by ordinal position only. The catalog
//! supplies the matching column names and marks which of them belong to the
//! primary key.

use anyhow::Result;
use async_trait::async_trait;
use binlog_core::{ColumnInfo, SchemaCatalog};
use mysql_async::prelude::*;
use mysql_async::Pool;
use tracing::debug;

const COLUMNS_QUERY: &str = "
    SELECT COLUMN_NAME, COLUMN_KEY
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION";

/// Schema catalog backed by a MySQL connection pool.
#[derive(Clone)]
pub struct MySQLSchemaCatalog {
    pool: Pool,
}

impl MySQLSchemaCatalog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaCatalog for MySQLSchemaCatalog {
    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<mysql_async::Row> = conn.exec(COLUMNS_QUERY, (schema, table)).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .get(0)
                .ok_or_else(|| anyhow::anyhow!("Missing column name"))?;
            let key: String = row.get::<Option<String>, _>(1).flatten().unwrap_or_default();
            columns.push(column_info(name, &key));
        }

        debug!(
            "Fetched {} columns for {}.{} from INFORMATION_SCHEMA",
            columns.len(),
            schema,
            table
        );
        Ok(columns)
    }
}

/// `COLUMN_KEY` is `PRI` for every member of the primary key.
fn column_info(name: String, column_key: &str) -> ColumnInfo {
    ColumnInfo::new(name, column_key.eq_ignore_ascii_case("PRI"))
}
