use std::collections::BTreeMap;

use tracing::warn;

use crate::types::Value;

/// Per-execution state threaded through filter translation and row materialization.
///
/// One instance exists per query execution, so concurrent executions over the
/// same [`Schema`](crate::schema::Schema) never observe each other's bound
/// request values.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Identifier used to correlate log records of one execution.
    pub execution_id: String,
    bindings: BTreeMap<String, Value>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Binds a request value for `field`.
    ///
    /// The first binding wins. A later binding with a different value is
    /// ignored and logged; returns whether the value was stored.
    pub fn bind(&mut self, field: &str, value: Value) -> bool {
        match self.bindings.get(field) {
            None => {
                self.bindings.insert(field.to_string(), value);
                true
            }
            Some(existing) if *existing == value => false,
            Some(existing) => {
                warn!(
                    execution_id = %self.execution_id,
                    field,
                    ?existing,
                    ?value,
                    "request field already bound, keeping first value"
                );
                false
            }
        }
    }

    /// Value bound to `field` during translation, if any.
    #[must_use]
    pub fn bound_value(&self, field: &str) -> Option<&Value> {
        self.bindings.get(field)
    }

    /// All bound values keyed by field name, for template rendering.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }
}
