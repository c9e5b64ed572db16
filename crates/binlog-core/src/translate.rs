//! Row mutation translation.
//!
//! | kind   | forward                              | flashback                            |
//! |--------|--------------------------------------|--------------------------------------|
//! | INSERT | `INSERT ... VALUES (after)`          | `DELETE ... WHERE key(after)`        |
//! | DELETE | `DELETE ... WHERE key(before)`       | `INSERT ... VALUES (before)`         |
//! | UPDATE | `UPDATE SET after WHERE key(before)` | `UPDATE SET before WHERE key(after)` |
//!
//! Every UPDATE and DELETE carries `LIMIT 1` so an imprecise predicate can
//! touch at most one row.

use crate::error::{EngineError, Result};
use crate::predicate::{self, render_value, Clause};
use crate::types::{GeneratedStatement, MutationEvent, MutationKind, TableMetadata};

/// Direction of translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslateMode {
    /// Reproduce the recorded mutation.
    #[default]
    Forward,
    /// Produce the statement that undoes the recorded mutation.
    Flashback,
}

impl TranslateMode {
    pub fn from_flashback(flashback: bool) -> Self {
        if flashback {
            TranslateMode::Flashback
        } else {
            TranslateMode::Forward
        }
    }
}

/// Turns one mutation event plus its table metadata into one statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    mode: TranslateMode,
}

impl Translator {
    pub fn new(mode: TranslateMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TranslateMode {
        self.mode
    }

    pub fn translate(
        &self,
        event: &MutationEvent,
        meta: &TableMetadata,
    ) -> Result<GeneratedStatement> {
        let table = RenderTarget { event, meta };

        let (kind, sql) = match (event.kind, self.mode) {
            (MutationKind::Insert, TranslateMode::Forward) => {
                (MutationKind::Insert, table.insert(table.after()?)?)
            }
            (MutationKind::Insert, TranslateMode::Flashback) => {
                (MutationKind::Delete, table.delete(table.after()?)?)
            }
            (MutationKind::Delete, TranslateMode::Forward) => {
                (MutationKind::Delete, table.delete(table.before()?)?)
            }
            (MutationKind::Delete, TranslateMode::Flashback) => {
                (MutationKind::Insert, table.insert(table.before()?)?)
            }
            (MutationKind::Update, TranslateMode::Forward) => (
                MutationKind::Update,
                table.update(table.after()?, table.before()?)?,
            ),
            (MutationKind::Update, TranslateMode::Flashback) => (
                MutationKind::Update,
                table.update(table.before()?, table.after()?)?,
            ),
        };

        Ok(GeneratedStatement::new(event.timestamp, sql, kind.into()))
    }
}

struct RenderTarget<'a> {
    event: &'a MutationEvent,
    meta: &'a TableMetadata,
}

impl RenderTarget<'_> {
    fn before(&self) -> Result<&[String]> {
        self.image(self.event.before.as_deref(), "before")
    }

    fn after(&self) -> Result<&[String]> {
        self.image(self.event.after.as_deref(), "after")
    }

    fn image<'i>(&self, image: Option<&'i [String]>, which: &'static str) -> Result<&'i [String]> {
        image.ok_or_else(|| EngineError::MissingRowImage {
            kind: self.event.kind,
            schema: self.meta.schema.clone(),
            table: self.meta.table.clone(),
            image: which,
        })
    }

    /// Column names matching the image length, for minimal row images.
    fn columns_for(&self, values: &[String]) -> Result<&[String]> {
        self.meta
            .columns
            .get(..values.len())
            .ok_or_else(|| EngineError::ColumnCountMismatch {
                schema: self.meta.schema.clone(),
                table: self.meta.table.clone(),
                columns: self.meta.columns.len(),
                values: values.len(),
            })
    }

    fn clause(&self, values: &[String], clause: Clause) -> Result<String> {
        let columns = self.columns_for(values)?;
        predicate::build(columns, values, &self.meta.primary_key, clause).ok_or_else(|| {
            EngineError::EmptyPredicate {
                schema: self.meta.schema.clone(),
                table: self.meta.table.clone(),
            }
        })
    }

    fn insert(&self, values: &[String]) -> Result<String> {
        let columns = self.columns_for(values)?;
        let column_list = columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(",");
        let value_list = values
            .iter()
            .map(|v| render_value(v))
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!(
            "INSERT INTO {}({column_list}) VALUES ({value_list})",
            self.meta.qualified_name()
        ))
    }

    fn delete(&self, key_source: &[String]) -> Result<String> {
        Ok(format!(
            "DELETE FROM {} WHERE {} LIMIT 1",
            self.meta.qualified_name(),
            self.clause(key_source, Clause::Where)?
        ))
    }

    fn update(&self, set_source: &[String], key_source: &[String]) -> Result<String> {
        Ok(format!(
            "UPDATE {} SET {} WHERE {} LIMIT 1",
            self.meta.qualified_name(),
            self.clause(set_source, Clause::Set)?,
            self.clause(key_source, Clause::Where)?
        ))
    }
}
