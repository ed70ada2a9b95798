//! Mapper-free flattening: nested keys are joined into column names.

use crate::mapping::Row;
use serde_json::Value;

/// Options for [`flatten_record`]
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Prepended to every column name
    pub prefix: String,
    /// Joins parent and child keys
    pub separator: String,
    /// Render lists as JSON text instead of keeping them as values
    pub stringify_lists: bool,
    pub lowercase_keys: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions {
            prefix: String::new(),
            separator: String::from("_"),
            stringify_lists: false,
            lowercase_keys: false,
        }
    }
}

/// Flatten one record, e.g. `{"a": {"b": {"c": 1}}}` into `{"a_b_c": 1}`
pub fn flatten_record(record: &Value, options: &FlattenOptions) -> Row {
    let mut row = Row::new();
    match record {
        Value::Object(_) => flatten_into(record, &options.prefix, options, &mut row),
        other => {
            let key = column_key(&format!("{}value", options.prefix), options);
            insert_leaf(&mut row, key, other, options);
        }
    }
    row
}

fn flatten_into(value: &Value, prefix: &str, options: &FlattenOptions, row: &mut Row) {
    let Value::Object(map) = value else {
        return;
    };

    for (key, child) in map {
        let column = column_key(&format!("{}{}", prefix, key), options);
        match child {
            Value::Object(_) => {
                let nested_prefix = format!("{}{}", column, options.separator);
                flatten_into(child, &nested_prefix, options, row);
            }
            _ => insert_leaf(row, column, child, options),
        }
    }
}

fn insert_leaf(row: &mut Row, column: String, value: &Value, options: &FlattenOptions) {
    let value = match value {
        Value::Array(_) if options.stringify_lists => Value::String(value.to_string()),
        other => other.clone(),
    };
    row.insert(column, value);
}

fn column_key(key: &str, options: &FlattenOptions) -> String {
    if options.lowercase_keys {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects() {
        let row = flatten_record(&json!({"a": {"b": {"c": 1}}, "d": "x"}), &FlattenOptions::default());
        assert_eq!(Value::Object(row), json!({"a_b_c": 1, "d": "x"}));
    }

    #[test]
    fn test_lists_kept_or_stringified() {
        let record = json!({"tags": ["a", "b"], "meta": {"ids": [1, 2]}});

        let row = flatten_record(&record, &FlattenOptions::default());
        assert_eq!(row["tags"], json!(["a", "b"]));

        let options = FlattenOptions { stringify_lists: true, ..Default::default() };
        let row = flatten_record(&record, &options);
        assert_eq!(row["tags"], json!("[\"a\",\"b\"]"));
        assert_eq!(row["meta_ids"], json!("[1,2]"));
    }

    #[test]
    fn test_prefix_and_lowercase() {
        let options = FlattenOptions {
            prefix: "Src_".to_string(),
            separator: ".".to_string(),
            lowercase_keys: true,
            ..Default::default()
        };
        let row = flatten_record(&json!({"Trip": {"ID": 7}}), &options);
        assert_eq!(Value::Object(row), json!({"src_trip.id": 7}));
    }

    #[test]
    fn test_scalar_record() {
        let row = flatten_record(&json!(5), &FlattenOptions::default());
        assert_eq!(Value::Object(row), json!({"value": 5}));
    }
}
