//! Table configuration: which mappers feed which table.
//!
//! Configurations are built in code with [`FieldMapper`] or loaded from a
//! JSON document of the form
//!
//! ```json
//! {
//!   "trips": [
//!     {"location": "root::tripUpdate::trip::tripId", "column_name": "trip_id"},
//!     {"location": "root::tip_amount", "column_name": "tip", "coalesce_value": 0,
//!      "convert_function": "negate"}
//!   ]
//! }
//! ```

use crate::error::{CrunchError, Result};
use crate::mapping::{FieldMapper, ListElementPolicy, MissingPolicy, DEFAULT_DELIMITER};
use crate::transforms::TransformRegistry;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Declarative description of a single [`FieldMapper`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapperSpec {
    pub location: String,
    pub column_name: String,
    #[serde(default)]
    pub coalesce_value: Option<Value>,
    /// Name of a transform in the registry
    #[serde(default)]
    pub convert_function: Option<String>,
    #[serde(default)]
    pub if_missing: MissingPolicy,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub list_elements: ListElementPolicy,
    #[serde(default = "default_true")]
    pub attempt_json_decoding: bool,
    #[serde(default)]
    pub null_as_missing: bool,
    #[serde(default)]
    pub pass_type: Option<String>,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_true() -> bool {
    true
}

impl MapperSpec {
    /// Build the mapper, looking up `convert_function` in `registry`
    pub fn build(&self, registry: &TransformRegistry) -> Result<FieldMapper> {
        let mut mapper = FieldMapper::with_delimiter(&self.location, &self.column_name, &self.delimiter)?
            .if_missing(self.if_missing)
            .list_elements(self.list_elements)
            .decode_json_strings(self.attempt_json_decoding)
            .null_as_missing(self.null_as_missing);

        if let Some(value) = &self.coalesce_value {
            mapper = mapper.coalesce(value.clone());
        }

        if let Some(name) = &self.convert_function {
            let transform = registry.get(name).ok_or_else(|| {
                CrunchError::Config(format!(
                    "unknown convert_function '{}' for column '{}'; known: {:?}",
                    name,
                    self.column_name,
                    registry.names()
                ))
            })?;
            mapper = mapper.convert_with(transform);
        }

        if let Some(label) = &self.pass_type {
            mapper = mapper.pass_type(label.clone());
        }

        Ok(mapper)
    }
}

/// Table name to ordered mapper list
#[derive(Debug, Clone, Default)]
pub struct TableConfig {
    tables: HashMap<String, Vec<FieldMapper>>,
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table
    pub fn with_table(mut self, name: impl Into<String>, mappers: Vec<FieldMapper>) -> Result<Self> {
        self.insert(name, mappers)?;
        Ok(self)
    }

    /// Add a table; table names and the column names within a table must be unique
    pub fn insert(&mut self, name: impl Into<String>, mappers: Vec<FieldMapper>) -> Result<()> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(CrunchError::Config(format!("table '{}' is defined twice", name)));
        }

        let mut columns = HashSet::new();
        for mapper in &mappers {
            if !columns.insert(mapper.column_name()) {
                return Err(CrunchError::Config(format!(
                    "table '{}' maps column '{}' more than once",
                    name,
                    mapper.column_name()
                )));
            }
        }

        self.tables.insert(name, mappers);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[FieldMapper]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// The stored table name alongside its mappers
    pub fn get_entry(&self, name: &str) -> Option<(&str, &[FieldMapper])> {
        self.tables
            .get_key_value(name)
            .map(|(name, mappers)| (name.as_str(), mappers.as_slice()))
    }

    /// Table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn from_specs<'s, I>(specs: I, registry: &TransformRegistry) -> Result<Self>
    where
        I: IntoIterator<Item = (&'s String, &'s Vec<MapperSpec>)>,
    {
        let mut config = Self::new();
        for (table, mapper_specs) in specs {
            let mappers = mapper_specs
                .iter()
                .map(|spec| spec.build(registry))
                .collect::<Result<Vec<_>>>()?;
            config.insert(table.clone(), mappers)?;
        }
        Ok(config)
    }

    /// Parse a JSON table configuration document. A table key appearing
    /// twice is a configuration error.
    pub fn from_json_str(text: &str, registry: &TransformRegistry) -> Result<Self> {
        let specs: TableSpecs = serde_json::from_str(text)?;
        Self::from_specs(specs.0.iter().map(|(name, specs)| (name, specs)), registry)
    }

    pub fn from_json_value(value: Value, registry: &TransformRegistry) -> Result<Self> {
        let specs: TableSpecs = serde_json::from_value(value)?;
        Self::from_specs(specs.0.iter().map(|(name, specs)| (name, specs)), registry)
    }
}

/// Table entries in document order, duplicates included
struct TableSpecs(Vec<(String, Vec<MapperSpec>)>);

impl<'de> Deserialize<'de> for TableSpecs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableSpecsVisitor;

        impl<'de> Visitor<'de> for TableSpecsVisitor {
            type Value = TableSpecs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of table names to mapper lists")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<TableSpecs, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Vec<MapperSpec>>()? {
                    entries.push(entry);
                }
                Ok(TableSpecs(entries))
            }
        }

        deserializer.deserialize_map(TableSpecsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldOutcome;
    use serde_json::json;

    #[test]
    fn test_load_from_json() {
        let text = r#"{
            "trips": [
                {"location": "root::tripUpdate::trip::tripId", "column_name": "trip_id", "pass_type": "str"},
                {"location": "root::tip_amount", "column_name": "tip", "coalesce_value": 0,
                 "convert_function": "negate", "if_missing": "drop"}
            ],
            "stops": [
                {"location": "root.stops[].name", "column_name": "stop", "delimiter": ".",
                 "list_elements": "null"}
            ]
        }"#;

        let config = TableConfig::from_json_str(text, &TransformRegistry::with_builtins()).unwrap();
        assert_eq!(config.table_names(), vec!["stops", "trips"]);

        let trips = config.get("trips").unwrap();
        assert_eq!(trips[0].column_name(), "trip_id");
        assert_eq!(trips[0].type_label(), Some("str"));
        assert_eq!(trips[1].missing_policy(), MissingPolicy::Drop);
        assert_eq!(trips[1].apply(&json!({"tip_amount": 300})).unwrap(), FieldOutcome::Single(json!(-300)));
        assert_eq!(trips[1].apply(&json!({})).unwrap(), FieldOutcome::Single(json!(0)));

        let stops = config.get("stops").unwrap();
        assert!(stops[0].path().has_list());
    }

    #[test]
    fn test_unknown_transform() {
        let config = json!({"t": [{"location": "root::a", "column_name": "a", "convert_function": "nope"}]});
        let err = TableConfig::from_json_value(config, &TransformRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, CrunchError::Config(_)));
    }

    #[test]
    fn test_bad_location_fails_at_load() {
        let config = json!({"t": [{"location": "a::b", "column_name": "a"}]});
        let err = TableConfig::from_json_value(config, &TransformRegistry::new()).unwrap_err();
        assert!(matches!(err, CrunchError::MalformedPath { .. }));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let config = json!({"t": [{"location": "root::a", "column_name": "a", "if_mising": "drop"}]});
        let err = TableConfig::from_json_value(config, &TransformRegistry::new()).unwrap_err();
        assert!(matches!(err, CrunchError::Json(_)));

        let config = json!({"t": [{"location": "root::a", "column_name": "a", "if_missing": "ignore"}]});
        assert!(TableConfig::from_json_value(config, &TransformRegistry::new()).is_err());
    }

    #[test]
    fn test_duplicate_table_key_rejected() {
        let text = r#"{
            "t": [{"location": "root::a", "column_name": "a"}],
            "t": [{"location": "root::b", "column_name": "b"}]
        }"#;
        let err = TableConfig::from_json_str(text, &TransformRegistry::new()).unwrap_err();
        assert!(matches!(err, CrunchError::Config(_)));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mappers = vec![
            FieldMapper::new("root::a", "c").unwrap(),
            FieldMapper::new("root::b", "c").unwrap(),
        ];
        let err = TableConfig::new().with_table("t", mappers).unwrap_err();
        assert!(matches!(err, CrunchError::Config(_)));

        let config = json!({"t": [
            {"location": "root::a", "column_name": "c"},
            {"location": "root::b", "column_name": "c"}
        ]});
        let err = TableConfig::from_json_value(config, &TransformRegistry::new()).unwrap_err();
        assert!(matches!(err, CrunchError::Config(_)));
    }

    #[test]
    fn test_table_defined_twice() {
        let config = TableConfig::new()
            .with_table("t", vec![FieldMapper::new("root::a", "a").unwrap()])
            .unwrap();
        assert!(config.with_table("t", vec![]).is_err());
    }
}
