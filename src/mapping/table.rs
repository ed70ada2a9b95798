//! Builds the flat rows one input record contributes to a table.

use crate::error::{CrunchError, Result};
use crate::mapping::mapper::{FieldMapper, FieldOutcome};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// A flat output record: column name to value, in mapper order
pub type Row = Map<String, Value>;

/// Applies a table's mappers to input records
#[derive(Debug, Clone, Copy)]
pub struct TableBuilder<'a> {
    table: &'a str,
    mappers: &'a [FieldMapper],
}

impl<'a> TableBuilder<'a> {
    pub fn new(table: &'a str, mappers: &'a [FieldMapper]) -> Self {
        TableBuilder { table, mappers }
    }

    pub fn table(&self) -> &'a str {
        self.table
    }

    /// Turn one record into zero rows (dropped), one row, or one row per
    /// element of the expanded list.
    ///
    /// Every mapper is applied before anything is decided, so a `drop`
    /// outcome wins over errors from other mappers regardless of order.
    pub fn build(&self, record: &Value) -> Result<Vec<Row>> {
        let results: Vec<Result<FieldOutcome>> = self.mappers.iter().map(|m| m.apply(record)).collect();

        if let Some(mapper) = self
            .mappers
            .iter()
            .zip(&results)
            .find_map(|(mapper, result)| matches!(result, Ok(FieldOutcome::Drop)).then_some(mapper))
        {
            debug!(
                table = self.table,
                column = mapper.column_name(),
                location = mapper.location(),
                "dropping record with missing value"
            );
            return Ok(Vec::new());
        }

        let outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;

        let width = self.expansion_width(&outcomes)?;
        trace!(table = self.table, width, "building rows");

        let rows = (0..width)
            .map(|i| {
                self.mappers
                    .iter()
                    .zip(&outcomes)
                    .map(|(mapper, outcome)| {
                        let value = match outcome {
                            FieldOutcome::Single(value) => value.clone(),
                            FieldOutcome::Many(values) => values[i].clone(),
                            FieldOutcome::Drop => unreachable!("dropped records return early"),
                        };
                        (mapper.column_name().to_string(), value)
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(rows)
    }

    /// Number of rows the record expands to; every list outcome must agree
    fn expansion_width(&self, outcomes: &[FieldOutcome]) -> Result<usize> {
        let mut first: Option<(&str, usize)> = None;

        for (mapper, outcome) in self.mappers.iter().zip(outcomes) {
            let FieldOutcome::Many(values) = outcome else {
                continue;
            };

            match first {
                None => first = Some((mapper.column_name(), values.len())),
                Some((first_column, expected)) if expected != values.len() => {
                    return Err(CrunchError::Alignment {
                        table: self.table.to_string(),
                        first_column: first_column.to_string(),
                        expected,
                        column: mapper.column_name().to_string(),
                        found: values.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(first.map_or(1, |(_, width)| width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::mapper::MissingPolicy;
    use crate::mapping::resolve::ListElementPolicy;
    use serde_json::json;

    fn mapper(location: &str, column: &str) -> FieldMapper {
        FieldMapper::new(location, column).unwrap()
    }

    #[test]
    fn test_single_row_in_mapper_order() {
        let mappers = vec![
            mapper("root::b", "second"),
            mapper("root::a", "first"),
            mapper("root::nested::c", "third"),
        ];
        let record = json!({"a": 1, "b": 2, "nested": {"c": 3}});

        let rows = TableBuilder::new("t", &mappers).build(&record).unwrap();
        assert_eq!(rows.len(), 1);

        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["second", "first", "third"]);
        assert_eq!(rows[0]["third"], json!(3));
    }

    #[test]
    fn test_list_expansion_repeats_scalars() {
        let mappers = vec![
            mapper("root::id", "id"),
            mapper("root::stops[]::name", "stop"),
            mapper("root::stops[]::seq", "seq"),
        ];
        let record = json!({
            "id": "t1",
            "stops": [
                {"name": "A", "seq": 1},
                {"name": "B", "seq": 2},
                {"name": "C", "seq": 3}
            ]
        });

        let rows = TableBuilder::new("stops", &mappers).build(&record).unwrap();
        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row["id"], json!("t1"));
            assert_eq!(row["seq"], json!(i + 1));
        }
        assert_eq!(rows[1]["stop"], json!("B"));
    }

    #[test]
    fn test_mismatched_widths_fail() {
        let mappers = vec![
            mapper("root::a[]::v", "a"),
            mapper("root::b[]::v", "b"),
        ];
        let record = json!({"a": [{"v": 1}, {"v": 2}], "b": [{"v": 1}]});

        let err = TableBuilder::new("t", &mappers).build(&record).unwrap_err();
        match err {
            CrunchError::Alignment { first_column, expected, column, found, .. } => {
                assert_eq!((first_column.as_str(), expected), ("a", 2));
                assert_eq!((column.as_str(), found), ("b", 1));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_skipped_elements_break_alignment() {
        let record = json!({"items": [{"v": 1, "w": 1}, {"w": 2}]});

        let lenient = vec![mapper("root::items[]::v", "v"), mapper("root::items[]::w", "w")];
        assert!(TableBuilder::new("t", &lenient).build(&record).is_err());

        let padded = vec![
            mapper("root::items[]::v", "v").list_elements(ListElementPolicy::Null),
            mapper("root::items[]::w", "w"),
        ];
        let rows = TableBuilder::new("t", &padded).build(&record).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["v"], Value::Null);
        assert_eq!(rows[1]["w"], json!(2));
    }

    #[test]
    fn test_drop_returns_no_rows() {
        let mappers = vec![
            mapper("root::id", "id"),
            mapper("root::missing", "m").if_missing(MissingPolicy::Drop),
        ];
        let rows = TableBuilder::new("t", &mappers).build(&json!({"id": 1})).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_absent_list_with_coalesce_gives_one_row() {
        let mappers = vec![
            mapper("root::id", "id"),
            mapper("root::stops[]::name", "stop").coalesce("none"),
        ];
        let rows = TableBuilder::new("t", &mappers).build(&json!({"id": 1, "stops": []})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["stop"], json!("none"));
    }

    #[test]
    fn test_drop_wins_over_fail_in_any_order() {
        let fail = mapper("root::required", "required");
        let drop = mapper("root::optional", "optional").if_missing(MissingPolicy::Drop);
        let record = json!({"id": 1});

        for mappers in [vec![fail.clone(), drop.clone()], vec![drop, fail]] {
            let rows = TableBuilder::new("t", &mappers).build(&record).unwrap();
            assert!(rows.is_empty());
        }
    }

    #[test]
    fn test_first_error_in_mapper_order() {
        let mappers = vec![mapper("root::a", "a"), mapper("root::b", "b")];
        let err = TableBuilder::new("t", &mappers).build(&json!({})).unwrap_err();
        assert!(matches!(err, CrunchError::MissingValue { column, .. } if column == "a"));
    }
}
