//! CSV payloads: first line is the header, every following line is a row.

use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{strip_root, ResponseFormat, Row, RowReader};

/// Reader for `text/csv` payloads.
///
/// Rows become objects keyed by the trimmed header names. Values are kept as
/// trimmed strings; typing happens during row materialization. A record with
/// fewer values than headers leaves the trailing fields `null`, and extra
/// values are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReader;

impl RowReader for CsvReader {
    /// The array path is ignored: a CSV payload is a single flat table.
    fn extract_array(&self, payload: &str, _path: &str) -> Vec<Row> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(::csv::Trim::All)
            .from_reader(payload.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
            Err(e) => {
                debug!(error = %e, "malformed CSV header, no rows");
                return Vec::new();
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "malformed CSV record, no rows");
                    return Vec::new();
                }
            };
            let mut row = Map::with_capacity(headers.len());
            for (i, header) in headers.iter().enumerate() {
                let value = record
                    .get(i)
                    .map_or(Json::Null, |v| Json::String(v.trim().to_string()));
                row.insert(header.clone(), value);
            }
            rows.push(Row::new(ResponseFormat::Csv, Json::Object(row)));
        }
        rows
    }

    /// The path is a header name, optionally prefixed with a root marker.
    fn extract_field(&self, row: &Row, _row_index: usize, path: &str) -> Json {
        let Some(record) = row.data().as_object() else {
            return Json::Null;
        };
        record
            .get(path.trim())
            .or_else(|| record.get(strip_root(path)))
            .cloned()
            .unwrap_or(Json::Null)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn short_record_leaves_trailing_fields_null() {
        let rows = CsvReader.extract_array("a,b,c\n1,2,3\n4,5\n", "");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data(), &json!({"a": "1", "b": "2", "c": "3"}));
        assert_eq!(rows[1].data(), &json!({"a": "4", "b": "5", "c": null}));
    }

    #[test]
    fn headers_and_values_are_trimmed() {
        let rows = CsvReader.extract_array(" id , name \n 7 ,  Ada \n", "");
        assert_eq!(rows[0].field(0, "id"), json!("7"));
        assert_eq!(rows[0].field(0, "name"), json!("Ada"));
    }

    #[test]
    fn extra_values_are_ignored() {
        let rows = CsvReader.extract_array("a\n1,2,3\n", "");
        assert_eq!(rows[0].data(), &json!({"a": "1"}));
    }

    #[test]
    fn quoted_values() {
        let rows = CsvReader.extract_array("name,city\n\"Smith, J\",Oslo\n", "");
        assert_eq!(rows[0].field(0, "name"), json!("Smith, J"));
    }

    #[test]
    fn header_only_or_empty_payload() {
        assert!(CsvReader.extract_array("a,b\n", "").is_empty());
        assert!(CsvReader.extract_array("", "").is_empty());
    }

    #[test]
    fn field_lookup_by_header_name() {
        let rows = CsvReader.extract_array("first name,age\nAda,36\n", "");
        assert_eq!(rows[0].field(0, "first name"), json!("Ada"));
        assert_eq!(rows[0].field(0, "$.age"), json!("36"));
        assert_eq!(rows[0].field(0, "missing"), Json::Null);
    }

    proptest! {
        #[test]
        fn values_are_trimmed(
            value in "[a-z0-9]{1,10}",
            left in " {0,3}",
            right in " {0,3}",
        ) {
            let payload = format!("col\n{left}{value}{right}\n");
            let rows = CsvReader.extract_array(&payload, "");
            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(rows[0].field(0, "col"), json!(value));
        }
    }
}
