//! Field mappers: one output column fed by one location.

use crate::error::{CrunchError, Result};
use crate::mapping::path::PathExpression;
use crate::mapping::resolve::{resolve_with, ListElementPolicy, ResolveOptions, Resolved};
use crate::transforms::Transform;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What to do when a location is absent and no coalesce value is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Abort with a missing value error
    #[default]
    Fail,
    /// Skip the whole input record
    Drop,
}

impl FromStr for MissingPolicy {
    type Err = CrunchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(MissingPolicy::Fail),
            "drop" => Ok(MissingPolicy::Drop),
            other => Err(CrunchError::Config(format!(
                "if_missing must be 'drop' or 'fail', got '{}'",
                other
            ))),
        }
    }
}

/// Result of applying one mapper to one record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Single(Value),
    /// One value per element of the expanded list
    Many(Vec<Value>),
    /// The record must not produce any rows
    Drop,
}

/// Maps a location inside an input record to an output column
#[derive(Clone)]
pub struct FieldMapper {
    path: PathExpression,
    column_name: String,
    coalesce_value: Option<Value>,
    convert_function: Option<Transform>,
    if_missing: MissingPolicy,
    options: ResolveOptions,
    pass_type: Option<String>,
}

impl FieldMapper {
    /// Parse `location` with the default delimiter and target `column_name`
    pub fn new(location: &str, column_name: impl Into<String>) -> Result<Self> {
        Ok(Self::from_path(PathExpression::parse(location)?, column_name))
    }

    /// Like [`FieldMapper::new`] for locations using another segment delimiter
    pub fn with_delimiter(location: &str, column_name: impl Into<String>, delimiter: &str) -> Result<Self> {
        Ok(Self::from_path(
            PathExpression::parse_with_delimiter(location, delimiter)?,
            column_name,
        ))
    }

    pub fn from_path(path: PathExpression, column_name: impl Into<String>) -> Self {
        FieldMapper {
            path,
            column_name: column_name.into(),
            coalesce_value: None,
            convert_function: None,
            if_missing: MissingPolicy::default(),
            options: ResolveOptions::default(),
            pass_type: None,
        }
    }

    /// Value used when the location is absent
    pub fn coalesce(mut self, value: impl Into<Value>) -> Self {
        self.coalesce_value = Some(value.into());
        self
    }

    /// Function applied to every resolved (or coalesced) value
    pub fn convert<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.convert_function = Some(Arc::new(f));
        self
    }

    pub fn convert_with(mut self, transform: Transform) -> Self {
        self.convert_function = Some(transform);
        self
    }

    pub fn if_missing(mut self, policy: MissingPolicy) -> Self {
        self.if_missing = policy;
        self
    }

    pub fn list_elements(mut self, policy: ListElementPolicy) -> Self {
        self.options.list_elements = policy;
        self
    }

    pub fn decode_json_strings(mut self, enabled: bool) -> Self {
        self.options.decode_json_strings = enabled;
        self
    }

    pub fn null_as_missing(mut self, enabled: bool) -> Self {
        self.options.null_as_missing = enabled;
        self
    }

    /// Type label reported by `Engine::column_types`
    pub fn pass_type(mut self, label: impl Into<String>) -> Self {
        self.pass_type = Some(label.into());
        self
    }

    pub fn path(&self) -> &PathExpression {
        &self.path
    }

    pub fn location(&self) -> &str {
        self.path.location()
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn coalesce_value(&self) -> Option<&Value> {
        self.coalesce_value.as_ref()
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.if_missing
    }

    pub fn type_label(&self) -> Option<&str> {
        self.pass_type.as_deref()
    }

    /// Resolve this mapper against `record` and apply coalescing,
    /// conversion and the missing value policy
    pub fn apply(&self, record: &Value) -> Result<FieldOutcome> {
        match resolve_with(&self.path, record, &self.options)? {
            Resolved::Absent => match &self.coalesce_value {
                Some(value) => Ok(FieldOutcome::Single(self.convert_value(value.clone())?)),
                None => match self.if_missing {
                    MissingPolicy::Drop => Ok(FieldOutcome::Drop),
                    MissingPolicy::Fail => Err(CrunchError::missing(&self.column_name, self.location())),
                },
            },
            Resolved::Scalar(value) => Ok(FieldOutcome::Single(self.convert_value(value.into_owned())?)),
            Resolved::ScalarList(values) => values
                .into_iter()
                .map(|value| self.convert_value(value.into_owned()))
                .collect::<Result<Vec<_>>>()
                .map(FieldOutcome::Many),
        }
    }

    fn convert_value(&self, value: Value) -> Result<Value> {
        let Some(convert) = &self.convert_function else {
            return Ok(value);
        };
        convert(value).map_err(|source| CrunchError::Transform {
            column: self.column_name.clone(),
            location: self.location().to_string(),
            source,
        })
    }
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapper")
            .field("location", &self.path.location())
            .field("column_name", &self.column_name)
            .field("coalesce_value", &self.coalesce_value)
            .field("convert_function", &self.convert_function.as_ref().map(|_| "<fn>"))
            .field("if_missing", &self.if_missing)
            .field("options", &self.options)
            .field("pass_type", &self.pass_type)
            .finish()
    }
}
