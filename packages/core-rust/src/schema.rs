use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Direction, ScalarType};

/// Errors raised while building a [`Schema`] or a [`Projection`] over it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },
    #[error("projection index {index} out of range for {len} fields")]
    ProjectionOutOfRange { index: usize, len: usize },
}

/// Static metadata for one column of a remote table.
///
/// Built once from table metadata before query execution and never mutated
/// afterwards. Values bound by equality filters on request fields live in the
/// per-execution [`ExecutionContext`](crate::context::ExecutionContext), not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name, unique within the table.
    pub name: String,
    /// Declared type. `None` returns the raw textual form of each value.
    #[serde(rename = "type", default)]
    pub ty: Option<ScalarType>,
    /// Whether the value appears in the request, the response, or both.
    #[serde(default)]
    pub direction: Direction,
    /// Format-specific path used to read the field from a response row.
    /// Ignored for [`Direction::Request`] fields.
    #[serde(default)]
    pub path: Option<String>,
}

impl Field {
    /// Creates a response field whose extraction path equals its name.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Option<ScalarType>) -> Self {
        let name = name.into();
        Self {
            path: Some(name.clone()),
            name,
            ty,
            direction: Direction::Response,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Path used to read this field from a response row, defaulting to the name.
    #[must_use]
    pub fn extraction_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered, name-unique set of fields describing one remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema, rejecting duplicate field names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if two fields share a name.
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self { fields, by_name })
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the schema into an Arrow schema with every column nullable.
    #[cfg(feature = "arrow")]
    #[must_use]
    pub fn to_arrow(&self) -> arrow_schema::Schema {
        let fields: Vec<arrow_schema::Field> = self
            .fields
            .iter()
            .map(|f| {
                let ty = f.ty.map_or(arrow_schema::DataType::Utf8, ScalarType::to_arrow);
                arrow_schema::Field::new(&f.name, ty, true)
            })
            .collect();
        arrow_schema::Schema::new(fields)
    }
}

/// Ordered subset of schema fields selected for output, by original index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    indices: Vec<usize>,
}

impl Projection {
    /// Every field in declared order.
    #[must_use]
    pub fn all(schema: &Schema) -> Self {
        Self {
            indices: (0..schema.len()).collect(),
        }
    }

    /// Builds a projection from optional column indices.
    ///
    /// `None` selects every field. Otherwise the projection is exactly the
    /// given indices in the given order; duplicates repeat a field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ProjectionOutOfRange`] for an index past the
    /// last field.
    pub fn new(schema: &Schema, indices: Option<&[usize]>) -> Result<Self, SchemaError> {
        let Some(indices) = indices else {
            return Ok(Self::all(schema));
        };
        if let Some(&index) = indices.iter().find(|&&i| i >= schema.len()) {
            return Err(SchemaError::ProjectionOutOfRange {
                index,
                len: schema.len(),
            });
        }
        Ok(Self {
            indices: indices.to_vec(),
        })
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Names of the projected fields in projection order.
    #[must_use]
    pub fn names<'a>(&self, schema: &'a Schema) -> Vec<&'a str> {
        self.indices
            .iter()
            .filter_map(|&i| schema.field(i))
            .map(|f| f.name.as_str())
            .collect()
    }
}
