//! Response payload readers.
//!
//! A payload is turned into an ordered list of [`Row`]s ("array extraction"),
//! and single fields are read out of one row ("field extraction"). Each
//! supported wire format implements [`RowReader`]; [`ResponseFormat`] is the
//! closed set of formats and dispatches to the matching reader.
//!
//! Readers never fail: malformed payloads produce no rows and unresolvable
//! paths produce JSON `null`.

pub mod csv;
pub mod json;
pub mod xml;

use serde::{Deserialize, Serialize};

pub use self::csv::CsvReader;
pub use self::json::JsonReader;
pub use self::xml::XmlReader;

/// Array and field extraction for one payload format.
pub trait RowReader {
    /// Extracts the repeated-row array at `path` from a raw payload.
    fn extract_array(&self, payload: &str, path: &str) -> Vec<Row>;

    /// Reads the value at `path` from `row`, the `row_index`-th row of its page.
    fn extract_field(&self, row: &Row, row_index: usize, path: &str) -> serde_json::Value;
}

/// Wire format of a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
    Csv,
}

impl ResponseFormat {
    /// Guesses the format from a `Content-Type` value.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime.ends_with("json") {
            Some(Self::Json)
        } else if mime.ends_with("xml") {
            Some(Self::Xml)
        } else if mime.ends_with("csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }

    #[must_use]
    pub fn extract_array(self, payload: &str, path: &str) -> Vec<Row> {
        match self {
            Self::Json => JsonReader.extract_array(payload, path),
            Self::Xml => XmlReader.extract_array(payload, path),
            Self::Csv => CsvReader.extract_array(payload, path),
        }
    }

    #[must_use]
    pub fn extract_field(self, row: &Row, row_index: usize, path: &str) -> serde_json::Value {
        match self {
            Self::Json => JsonReader.extract_field(row, row_index, path),
            Self::Xml => XmlReader.extract_field(row, row_index, path),
            Self::Csv => CsvReader.extract_field(row, row_index, path),
        }
    }
}

/// One element of a remote result set.
///
/// Holds the element in the JSON data model regardless of source format:
/// XML elements and CSV records are converted to objects whose keys keep
/// document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    format: ResponseFormat,
    data: serde_json::Value,
}

impl Row {
    #[must_use]
    pub fn new(format: ResponseFormat, data: serde_json::Value) -> Self {
        Self { format, data }
    }

    #[must_use]
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    #[must_use]
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Reads the value at `path` using this row's format.
    #[must_use]
    pub fn field(&self, row_index: usize, path: &str) -> serde_json::Value {
        self.format.extract_field(self, row_index, path)
    }
}

/// Removes leading root markers (`$`, `/`, `.`) from a path.
pub(crate) fn strip_root(path: &str) -> &str {
    path.trim()
        .trim_start_matches(|c: char| c == '$' || c == '/' || c == '.')
}

/// Walks `.`-separated object keys (or numeric array indices) from `value`.
pub(crate) fn lookup_dotted(value: &serde_json::Value, path: &str) -> serde_json::Value {
    let mut current = value;
    for segment in strip_root(path).split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => {
                segment.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return serde_json::Value::Null,
        }
    }
    current.clone()
}
