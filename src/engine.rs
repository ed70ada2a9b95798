//! The public facade: input records plus table configuration in, lazy
//! row sequences out.

use crate::config::TableConfig;
use crate::error::{CrunchError, Result};
use crate::flatten::{flatten_record, FlattenOptions};
use crate::mapping::{FieldMapper, Row, TableBuilder};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Holds the input records and table configuration for its whole lifetime
#[derive(Debug, Clone)]
pub struct Engine {
    records: Vec<Value>,
    tables: TableConfig,
}

impl Engine {
    pub fn new(records: Vec<Value>, tables: TableConfig) -> Self {
        Engine { records, tables }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.table_names()
    }

    /// Rows of `table`, produced lazily in input order. Every call starts
    /// over from the first input record.
    pub fn get_records(&self, table: &str) -> Result<Records<'_>> {
        let (name, mappers) = self.lookup(table)?;
        debug!(table = name, inputs = self.records.len(), "producing records");

        Ok(Records {
            builder: TableBuilder::new(name, mappers),
            inputs: self.records.iter(),
            pending: Vec::new().into_iter(),
            extra: None,
            stop_flag: None,
            finished: false,
        })
    }

    /// `(column, type label)` pairs, in mapper order, for mappers that carry a label
    pub fn column_types(&self, table: &str) -> Result<Vec<(&str, &str)>> {
        let (_, mappers) = self.lookup(table)?;
        Ok(mappers
            .iter()
            .filter_map(|m| m.type_label().map(|label| (m.column_name(), label)))
            .collect())
    }

    /// One row per input record without any mappers
    pub fn auto_flatten<'a>(&'a self, options: &'a FlattenOptions) -> impl Iterator<Item = Row> + 'a {
        self.records.iter().map(move |record| flatten_record(record, options))
    }

    fn lookup(&self, table: &str) -> Result<(&str, &[FieldMapper])> {
        self.tables.get_entry(table).ok_or_else(|| CrunchError::UnknownTable {
            table: table.to_string(),
            known: self.tables.table_names().into_iter().map(String::from).collect(),
        })
    }
}

/// Lazy sequence of rows for one table.
///
/// Yields `Err` for the first failing record and then ends.
pub struct Records<'a> {
    builder: TableBuilder<'a>,
    inputs: std::slice::Iter<'a, Value>,
    pending: std::vec::IntoIter<Row>,
    extra: Option<Row>,
    stop_flag: Option<Arc<AtomicBool>>,
    finished: bool,
}

impl<'a> Records<'a> {
    /// Append these columns to every row
    pub fn with_extra(mut self, extra: Row) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Stop with [`CrunchError::Cancelled`] once `flag` is set
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Collect every row, failing on the first error
    pub fn try_collect(self) -> Result<Vec<Row>> {
        self.collect()
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn decorate(&self, mut row: Row) -> Row {
        if let Some(extra) = &self.extra {
            for (key, value) in extra {
                row.insert(key.clone(), value.clone());
            }
        }
        row
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if self.stop_requested() {
                debug!(table = self.builder.table(), "record processing cancelled");
                self.finished = true;
                return Some(Err(CrunchError::Cancelled));
            }

            if let Some(row) = self.pending.next() {
                return Some(Ok(self.decorate(row)));
            }

            let Some(record) = self.inputs.next() else {
                self.finished = true;
                return None;
            };
            match self.builder.build(record) {
                Ok(rows) => self.pending = rows.into_iter(),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Records<'_> {}
