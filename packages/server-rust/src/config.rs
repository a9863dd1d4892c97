//! Connection and table configuration for the `resttable` connector.
//!
//! Both structs deserialize with `serde`; every field except the URL and the
//! table name has a default, so a minimal configuration is just:
//!
//! ```json
//! { "url": "https://api.example.com/orders" }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use http::Method;
use resttable_core::{Expr, Field, FilterGroups, ResponseFormat, Schema, SchemaError};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// How the remote endpoint is reached and paged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint URL. Rendering any template placeholders is up to the transport.
    pub url: String,
    /// HTTP method, case-insensitive in configuration.
    #[serde(deserialize_with = "deserialize_method")]
    pub method: Method,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Expected response content type. Selects the response format when the
    /// table does not name one.
    pub content_type: String,
    /// Local field name to remote API name, used in pushed criteria and
    /// projections.
    pub name_mapping: HashMap<String, String>,
    /// Rows requested per page (`limit`).
    pub page_size: u64,
    /// Number of the first page (`pageStart`).
    pub first_page: u64,
    /// Upper bound on pages fetched by one scan.
    pub max_pages: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::GET,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            content_type: "application/json".to_string(),
            name_mapping: HashMap::new(),
            page_size: 100,
            first_page: 1,
            max_pages: 1000,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Remote name for a local field.
    #[must_use]
    pub fn remote_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.name_mapping.get(field).map_or(field, String::as_str)
    }

    /// Checks values that would make paging meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty URL, a zero page size, or a zero
    /// page cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroMaxPages);
        }
        Ok(())
    }
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<Method, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Shape in which the host delivers filter groups for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterForm {
    /// OR of AND groups.
    #[default]
    Dnf,
    /// AND of OR groups.
    Cnf,
}

impl FilterForm {
    #[must_use]
    pub fn wrap(self, groups: Vec<Vec<Expr>>) -> FilterGroups {
        match self {
            Self::Dnf => FilterGroups::Dnf(groups),
            Self::Cnf => FilterGroups::Cnf(groups),
        }
    }
}

/// One remote table exposed over a connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// Payload format. Falls back to the connection's content type.
    #[serde(default)]
    pub format: Option<ResponseFormat>,
    /// Path to the repeated-row array inside each response.
    #[serde(default)]
    pub array_path: String,
    #[serde(default)]
    pub filter_form: FilterForm,
    pub fields: Vec<Field>,
}

impl TableConfig {
    /// Builds the table schema from the configured fields.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if two fields share a name.
    pub fn schema(&self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields.clone())
    }

    /// The configured format, else one guessed from the connection content
    /// type, else JSON.
    #[must_use]
    pub fn response_format(&self, connection: &ConnectionConfig) -> ResponseFormat {
        self.format
            .or_else(|| ResponseFormat::from_content_type(&connection.content_type))
            .unwrap_or_default()
    }
}
