//! # Dictcruncher - Nested Records to Flat Tables
//!
//! Maps values out of arbitrarily nested JSON-like records into flat rows,
//! one configured table at a time.
//!
//! ## Modules
//!
//! - **mapping**: location parsing, resolution, per-column policies, row building
//! - **engine**: the facade producing lazy row sequences per table
//! - **config**: table configuration in code or from JSON
//! - **transforms**: convert functions and the named transform registry
//! - **flatten**: flattening without any mappers
//!
//! ## Locations
//!
//! A location addresses a value inside a record: `root::trip::tripId`.
//! The `root` token is required, `::` separates keys, a trailing `[]`
//! expands a list (one row per element, at most one per location) and a
//! trailing `[N]` picks a single element.
//!
//! ## Quick Start
//!
//! ```rust
//! use dictcruncher::{Engine, FieldMapper, MissingPolicy, TableConfig};
//! use serde_json::json;
//!
//! # fn main() -> dictcruncher::Result<()> {
//! let records = vec![json!({
//!     "id": "1",
//!     "trip": {"tripId": "1337"},
//!     "stops": [{"name": "A"}, {"name": "B"}]
//! })];
//!
//! let tables = TableConfig::new().with_table(
//!     "stops",
//!     vec![
//!         FieldMapper::new("root::trip::tripId", "trip_id")?,
//!         FieldMapper::new("root::stops[]::name", "stop")?,
//!         FieldMapper::new("root::tip", "tip")?.coalesce(0),
//!         FieldMapper::new("root::id", "id")?.if_missing(MissingPolicy::Drop),
//!     ],
//! )?;
//!
//! let engine = Engine::new(records, tables);
//! let rows = engine.get_records("stops")?.try_collect()?;
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[1]["stop"], json!("B"));
//! assert_eq!(rows[1]["trip_id"], json!("1337"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod mapping;
pub mod transforms;

// Re-export commonly used types for convenience
pub use config::{MapperSpec, TableConfig};
pub use engine::{Engine, Records};
pub use error::{CrunchError, Result};
pub use flatten::{flatten_record, FlattenOptions};
pub use mapping::{
    FieldMapper, FieldOutcome, ListElementPolicy, MissingPolicy, PathExpression, Row, TableBuilder,
};
pub use transforms::{transform, Transform, TransformRegistry};

/// Main entry point: map `records` into the rows of one table
pub fn crunch(records: Vec<serde_json::Value>, tables: TableConfig, table: &str) -> Result<Vec<Row>> {
    Engine::new(records, tables).get_records(table)?.try_collect()
}
