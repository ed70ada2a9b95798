//! Location-driven mapping of nested records into flat table rows
//!
//! A location such as `root::trip::stops[]::name` is parsed once into a
//! [`PathExpression`], resolved against every input record, turned into a
//! column value by a [`FieldMapper`], and the per-column outcomes of one
//! record are aligned into rows by a [`TableBuilder`].

pub mod path;
pub mod resolve;
pub mod mapper;
pub mod table;

pub use path::{PathExpression, Segment, SegmentKind, DEFAULT_DELIMITER, ROOT_MARKER};
pub use resolve::{resolve, resolve_with, ListElementPolicy, ResolveOptions, Resolved};
pub use mapper::{FieldMapper, FieldOutcome, MissingPolicy};
pub use table::{Row, TableBuilder};
