//! Output sink abstraction.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::GeneratedStatement;

/// Receives generated statements in stream order.
///
/// Presentation (coloring, persistence) belongs to the implementation.
#[async_trait]
pub trait StatementSink: Send {
    async fn emit(&mut self, statement: &GeneratedStatement) -> Result<()>;

    /// Called once after the run ends, successfully or not.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects statements in memory.
#[async_trait]
impl StatementSink for Vec<GeneratedStatement> {
    async fn emit(&mut self, statement: &GeneratedStatement) -> Result<()> {
        self.push(statement.clone());
        Ok(())
    }
}
