//! Error types for the connector.

use resttable_core::{SchemaError, TranslateError};

/// Invalid connection settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("connection url is empty")]
    MissingUrl,
    #[error("page_size must be greater than zero")]
    ZeroPageSize,
    #[error("max_pages must be greater than zero")]
    ZeroMaxPages,
}

/// Errors that stop a scan from starting.
///
/// Failures on later pages surface from the cursor instead.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A filter the remote API cannot answer. The query must fail.
    #[error(transparent)]
    Unanswerable(TranslateError),
    /// A recoverable translation failure that was not absorbed by planning.
    #[error("filter translation failed: {0}")]
    Translate(TranslateError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("fetching the first page failed")]
    Transport(#[source] anyhow::Error),
}

impl From<TranslateError> for ScanError {
    fn from(e: TranslateError) -> Self {
        if e.is_fatal() {
            Self::Unanswerable(e)
        } else {
            Self::Translate(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use resttable_core::CompareOp;

    use super::*;

    #[test]
    fn only_fatal_translation_errors_are_unanswerable() {
        let fatal = TranslateError::Unanswerable {
            field: "city".to_string(),
            operator: CompareOp::Gt,
        };
        assert!(matches!(ScanError::from(fatal), ScanError::Unanswerable(_)));

        let recoverable = TranslateError::UnknownColumn { index: 9, len: 2 };
        assert!(matches!(
            ScanError::from(recoverable),
            ScanError::Translate(TranslateError::UnknownColumn { index: 9, len: 2 })
        ));
    }
}
