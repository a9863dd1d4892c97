//! Filter pushdown: relational comparison predicates to REST filter criteria.
//!
//! - [`expr`]: the predicate tree handed over by the query planner
//! - [`translate`]: per-leaf translation into a [`FilterCriterion`]
//! - [`groups`]: DNF/CNF assembly of translated leaves into [`CriterionGroups`]

pub mod expr;
pub mod groups;
pub mod translate;

use std::fmt;

use serde::{Serialize, Serializer};

use crate::types::Value;

pub use expr::{Expr, Literal};
pub use groups::{plan_pushdown, FilterGroups, PushdownPlan};
pub use translate::{DeclineReason, FilterTranslator, Pushdown, TranslateError};

/// Comparison operators that can be pushed to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    Regex,
}

impl CompareOp {
    /// Operator symbol as rendered into request templates.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Regex => "regex",
        }
    }

    /// Whether this is a pattern-match operator rather than an ordering one.
    #[must_use]
    pub fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::NotLike | Self::Regex)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for CompareOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// One normalized filter condition ready for request rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriterion {
    /// Outgoing parameter name, after connection-level name mapping.
    pub name: String,
    pub operator: CompareOp,
    pub value: Value,
}

/// Translated criteria grouped in normal form.
///
/// DNF is OR-of-ANDs (outer list OR, inner list AND); CNF is AND-of-ORs.
/// An empty outer list means no filter is pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionGroups {
    Dnf(Vec<Vec<FilterCriterion>>),
    Cnf(Vec<Vec<FilterCriterion>>),
}

impl CriterionGroups {
    #[must_use]
    pub fn groups(&self) -> &[Vec<FilterCriterion>] {
        match self {
            Self::Dnf(g) | Self::Cnf(g) => g,
        }
    }

    /// Whether no criterion is pushed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(Vec::is_empty)
    }

    /// Template context key for this grouping.
    #[must_use]
    pub fn context_key(&self) -> &'static str {
        match self {
            Self::Dnf(_) => "filters_dnf",
            Self::Cnf(_) => "filters_cnf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_serializes_operator_symbol() {
        let c = FilterCriterion {
            name: "age".to_string(),
            operator: CompareOp::Gte,
            value: Value::Int(18),
        };
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            serde_json::json!({"name": "age", "operator": ">=", "value": 18})
        );
    }

    #[test]
    fn pattern_operators() {
        assert!(CompareOp::Like.is_pattern());
        assert!(CompareOp::Regex.is_pattern());
        assert!(!CompareOp::Lte.is_pattern());
        assert_eq!(CompareOp::NotLike.to_string(), "not like");
    }

    #[test]
    fn groups_emptiness() {
        assert!(CriterionGroups::Dnf(vec![]).is_empty());
        assert!(CriterionGroups::Cnf(vec![vec![]]).is_empty());
        assert_eq!(CriterionGroups::Cnf(vec![]).context_key(), "filters_cnf");
    }
}
