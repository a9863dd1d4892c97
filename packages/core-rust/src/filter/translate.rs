//! Translation of a single comparison predicate into a [`FilterCriterion`].

use std::collections::HashMap;

use chrono::Duration;
use tracing::debug;

use super::expr::{Expr, Literal};
use super::{CompareOp, FilterCriterion};
use crate::context::ExecutionContext;
use crate::schema::Schema;
use crate::types::{Direction, Value};

/// Why a predicate was left for post-fetch evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The node is not a two-operand comparison.
    NotComparison,
    /// The left operand is not a column reference (e.g. `literal < column`).
    LeftNotColumn,
    /// The right operand is not a literal.
    RightNotLiteral,
}

/// Outcome of translating one predicate that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Pushdown {
    /// The predicate is pushed to the remote API as this criterion.
    Criterion(FilterCriterion),
    /// The predicate is not convertible and must be evaluated after retrieval.
    Declined(DeclineReason),
}

/// Translation failures.
///
/// [`TranslateError::Unanswerable`] is fatal and must abort the query; every
/// other variant is local and lets the caller fall back to post-fetch
/// filtering. Use [`TranslateError::is_fatal`] rather than matching on
/// variants in generic recovery paths.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error(
        "field '{field}' is request-only and cannot be filtered with '{operator}': \
         the remote API only ever returns the value supplied in the request. \
         Change the query to compare '{field}' with '=', or change the field's \
         direction to 'response' or 'both' in the table metadata"
    )]
    Unanswerable { field: String, operator: CompareOp },
    #[error("cannot push down {literal_type} literal for field '{field}': no rendering rule")]
    UnsupportedLiteral {
        field: String,
        literal_type: &'static str,
    },
    #[error("column index {index} out of range for {len} fields")]
    UnknownColumn { index: usize, len: usize },
}

impl TranslateError {
    /// Whether the error must terminate query execution.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unanswerable { .. })
    }
}

/// Translates comparison predicates against one table's fields.
#[derive(Debug, Clone, Copy)]
pub struct FilterTranslator<'a> {
    schema: &'a Schema,
    name_mapping: &'a HashMap<String, String>,
}

impl<'a> FilterTranslator<'a> {
    /// `name_mapping` maps internal field names to remote filter parameter names.
    #[must_use]
    pub fn new(schema: &'a Schema, name_mapping: &'a HashMap<String, String>) -> Self {
        Self {
            schema,
            name_mapping,
        }
    }

    /// Translates one leaf predicate.
    ///
    /// Equality filters on request fields bind the coerced value into `ctx`,
    /// where templates and row materialization pick it up.
    ///
    /// # Errors
    ///
    /// - [`TranslateError::Unanswerable`] for a request-only field compared
    ///   with anything but `=`.
    /// - [`TranslateError::UnsupportedLiteral`] when the literal type has no
    ///   rendering rule.
    /// - [`TranslateError::UnknownColumn`] for a column index outside the schema.
    pub fn translate(
        &self,
        expr: &Expr,
        ctx: &mut ExecutionContext,
    ) -> Result<Pushdown, TranslateError> {
        let Expr::Comparison { op, left, right } = expr else {
            return Ok(Pushdown::Declined(DeclineReason::NotComparison));
        };
        let Expr::Column(index) = **left else {
            return Ok(Pushdown::Declined(DeclineReason::LeftNotColumn));
        };
        let field = self
            .schema
            .field(index)
            .ok_or(TranslateError::UnknownColumn {
                index,
                len: self.schema.len(),
            })?;

        if field.direction == Direction::Request && *op != CompareOp::Eq {
            return Err(TranslateError::Unanswerable {
                field: field.name.clone(),
                operator: *op,
            });
        }

        let Expr::Literal(literal) = right.as_ref() else {
            return Ok(Pushdown::Declined(DeclineReason::RightNotLiteral));
        };
        let value = coerce_literal(literal).ok_or_else(|| TranslateError::UnsupportedLiteral {
            field: field.name.clone(),
            literal_type: literal.type_name(),
        })?;

        if field.direction.has_request_value() && *op == CompareOp::Eq {
            ctx.bind(&field.name, value.clone());
        }

        let name = self
            .name_mapping
            .get(&field.name)
            .cloned()
            .unwrap_or_else(|| field.name.clone());
        debug!(field = %field.name, %name, operator = %op, "pushed filter criterion");

        Ok(Pushdown::Criterion(FilterCriterion {
            name,
            operator: *op,
            value,
        }))
    }
}

/// Coerces a literal into a typed value; `None` when no rendering rule exists.
fn coerce_literal(literal: &Literal) -> Option<Value> {
    let value = match literal {
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Char(s) => Value::String(s.clone()),
        Literal::TinyInt(i) => Value::Int(i64::from(*i)),
        Literal::SmallInt(i) => Value::Int(i64::from(*i)),
        Literal::Integer(i) => Value::Int(i64::from(*i)),
        Literal::BigInt(i) => Value::Int(*i),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::Real(f) => Value::Float(f64::from(*f)),
        Literal::Double(f) => Value::Float(*f),
        Literal::Date(d) => Value::Date(*d),
        Literal::Time(t) => Value::Time(*t),
        Literal::TimeWithZone(t, offset) => {
            let (utc, _) =
                t.overflowing_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())));
            Value::Time(utc)
        }
        Literal::Timestamp(ts) => Value::Timestamp(*ts),
        Literal::TimestampWithZone(ts) => Value::Timestamp(ts.naive_utc()),
        Literal::Null | Literal::Binary(_) | Literal::Interval { .. } => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::schema::Field;
    use crate::types::ScalarType;

    const ALL_OPS: [CompareOp; 9] = [
        CompareOp::Eq,
        CompareOp::Neq,
        CompareOp::Gt,
        CompareOp::Gte,
        CompareOp::Lt,
        CompareOp::Lte,
        CompareOp::Like,
        CompareOp::NotLike,
        CompareOp::Regex,
    ];

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", Some(ScalarType::BigInt)),
            Field::new("city", Some(ScalarType::String)).with_direction(Direction::Request),
            Field::new("price", Some(ScalarType::Decimal)).with_direction(Direction::Both),
        ])
        .unwrap()
    }

    fn supported_literals() -> Vec<(Literal, Value)> {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let time = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
        let ts = date.and_time(time);
        let dec: Decimal = "19.99".parse().unwrap();
        vec![
            (Literal::Boolean(true), Value::Bool(true)),
            (Literal::Char("Oslo".to_string()), Value::String("Oslo".to_string())),
            (Literal::TinyInt(-3), Value::Int(-3)),
            (Literal::SmallInt(300), Value::Int(300)),
            (Literal::Integer(70_000), Value::Int(70_000)),
            (Literal::BigInt(9_999_999_999), Value::Int(9_999_999_999)),
            (Literal::Decimal(dec), Value::Decimal(dec)),
            (Literal::Real(1.5), Value::Float(1.5)),
            (Literal::Double(2.25), Value::Float(2.25)),
            (Literal::Date(date), Value::Date(date)),
            (Literal::Time(time), Value::Time(time)),
            (Literal::Timestamp(ts), Value::Timestamp(ts)),
        ]
    }

    #[test]
    fn request_field_non_equality_is_unanswerable() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        for op in ALL_OPS.into_iter().filter(|op| *op != CompareOp::Eq) {
            let mut ctx = ExecutionContext::default();
            let expr = Expr::column_cmp(1, op, Literal::Char("x".to_string()));
            let err = translator.translate(&expr, &mut ctx).unwrap_err();
            assert!(err.is_fatal());
            assert_eq!(
                err,
                TranslateError::Unanswerable {
                    field: "city".to_string(),
                    operator: op
                }
            );
            let message = err.to_string();
            assert!(message.contains("city"));
            assert!(message.contains(op.symbol()));
            assert!(message.contains("direction"));
            assert!(ctx.values().is_empty());
        }
    }

    #[test]
    fn unanswerable_fires_before_literal_check() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        let expr = Expr::compare(CompareOp::Gt, Expr::column(1), Expr::column(0));
        let err = translator
            .translate(&expr, &mut ExecutionContext::default())
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn request_field_equality_binds_every_supported_type() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        for (literal, expected) in supported_literals() {
            let mut ctx = ExecutionContext::default();
            let expr = Expr::column_cmp(1, CompareOp::Eq, literal);
            let pushdown = translator.translate(&expr, &mut ctx).unwrap();
            let Pushdown::Criterion(criterion) = pushdown else {
                panic!("expected criterion");
            };
            assert_eq!(criterion.value, expected);
            assert_eq!(ctx.bound_value("city"), Some(&expected));
        }
    }

    #[test]
    fn both_field_binds_on_equality_only() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        let dec: Decimal = "5".parse().unwrap();

        let mut ctx = ExecutionContext::default();
        let expr = Expr::column_cmp(2, CompareOp::Gt, Literal::Decimal(dec));
        assert!(matches!(
            translator.translate(&expr, &mut ctx).unwrap(),
            Pushdown::Criterion(_)
        ));
        assert!(ctx.bound_value("price").is_none());

        let expr = Expr::column_cmp(2, CompareOp::Eq, Literal::Decimal(dec));
        translator.translate(&expr, &mut ctx).unwrap();
        assert_eq!(ctx.bound_value("price"), Some(&Value::Decimal(dec)));
    }

    #[test]
    fn response_field_never_binds() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        let mut ctx = ExecutionContext::default();
        let expr = Expr::column_cmp(0, CompareOp::Eq, Literal::BigInt(4));
        translator.translate(&expr, &mut ctx).unwrap();
        assert!(ctx.values().is_empty());
    }

    #[test]
    fn declines_unconvertible_shapes() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        let mut ctx = ExecutionContext::default();

        let not_cmp = Expr::And(vec![]);
        assert_eq!(
            translator.translate(&not_cmp, &mut ctx).unwrap(),
            Pushdown::Declined(DeclineReason::NotComparison)
        );

        let reversed = Expr::compare(
            CompareOp::Lt,
            Expr::literal(Literal::BigInt(3)),
            Expr::column(0),
        );
        assert_eq!(
            translator.translate(&reversed, &mut ctx).unwrap(),
            Pushdown::Declined(DeclineReason::LeftNotColumn)
        );

        let col_col = Expr::compare(CompareOp::Eq, Expr::column(0), Expr::column(2));
        assert_eq!(
            translator.translate(&col_col, &mut ctx).unwrap(),
            Pushdown::Declined(DeclineReason::RightNotLiteral)
        );
    }

    #[test]
    fn unsupported_literal_is_recoverable() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        for literal in [
            Literal::Null,
            Literal::Binary(vec![1, 2]),
            Literal::Interval {
                months: 1,
                millis: 0,
            },
        ] {
            let expr = Expr::column_cmp(0, CompareOp::Eq, literal);
            let err = translator
                .translate(&expr, &mut ExecutionContext::default())
                .unwrap_err();
            assert!(!err.is_fatal());
            assert!(matches!(err, TranslateError::UnsupportedLiteral { .. }));
        }
    }

    #[test]
    fn unknown_column_is_recoverable() {
        let schema = schema();
        let mapping = HashMap::new();
        let translator = FilterTranslator::new(&schema, &mapping);
        let expr = Expr::column_cmp(9, CompareOp::Eq, Literal::BigInt(1));
        let err = translator
            .translate(&expr, &mut ExecutionContext::default())
            .unwrap_err();
        assert_eq!(err, TranslateError::UnknownColumn { index: 9, len: 3 });
        assert!(!err.is_fatal());
    }

    #[test]
    fn zoned_literals_normalise_to_utc() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let time = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        assert_eq!(
            coerce_literal(&Literal::TimeWithZone(time, plus_two)),
            Some(Value::Time(NaiveTime::from_hms_opt(23, 0, 0).unwrap()))
        );

        let ts = plus_two.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            coerce_literal(&Literal::TimestampWithZone(ts)),
            Some(Value::Timestamp(expected))
        );
    }

    proptest! {
        #[test]
        fn name_mapping_applies_when_present(
            mapped in proptest::option::of("[a-z_]{1,12}"),
            field_index in 0usize..3,
        ) {
            let schema = schema();
            let field_name = schema.field(field_index).unwrap().name.clone();
            let mut mapping = HashMap::new();
            if let Some(remote) = &mapped {
                mapping.insert(field_name.clone(), remote.clone());
            }
            let translator = FilterTranslator::new(&schema, &mapping);
            let expr = Expr::column_cmp(field_index, CompareOp::Eq, Literal::Char("v".to_string()));
            let Pushdown::Criterion(criterion) = translator
                .translate(&expr, &mut ExecutionContext::default())
                .unwrap()
            else {
                panic!("expected criterion");
            };
            prop_assert_eq!(criterion.name, mapped.unwrap_or(field_name));
        }
    }
}
