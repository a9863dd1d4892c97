//! `resttable` connector: exposes a paginated REST resource as a relational
//! table.
//!
//! Configure a [`RestTable`] from a [`ConnectionConfig`] and a
//! [`TableConfig`], then call [`RestTable::scan`] with a [`Transport`] to get
//! a cursor over typed rows.

pub mod config;
pub mod error;
pub mod scan;
pub mod telemetry;

pub use config::{ConnectionConfig, FilterForm, TableConfig};
pub use error::{ConfigError, ScanError};
pub use scan::{HttpPageSource, RestTable, Transport};
