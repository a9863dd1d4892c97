//! Predicate tree produced by the host query planner.
//!
//! Only the shapes the translator inspects are modelled; anything the planner
//! emits beyond a column/literal comparison is carried as [`Expr::Call`] and
//! left for post-fetch evaluation.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::CompareOp;

/// Typed literal operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Char(String),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Decimal(Decimal),
    Real(f32),
    Double(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Time of day with a UTC offset.
    TimeWithZone(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    TimestampWithZone(DateTime<FixedOffset>),
    Binary(Vec<u8>),
    Interval { months: i32, millis: i64 },
}

impl Literal {
    /// SQL name of the literal's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Char(_) => "CHAR",
            Self::TinyInt(_) => "TINYINT",
            Self::SmallInt(_) => "SMALLINT",
            Self::Integer(_) => "INTEGER",
            Self::BigInt(_) => "BIGINT",
            Self::Decimal(_) => "DECIMAL",
            Self::Real(_) => "REAL",
            Self::Double(_) => "DOUBLE",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::TimeWithZone(..) => "TIME WITH TIME ZONE",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::TimestampWithZone(_) => "TIMESTAMP WITH TIME ZONE",
            Self::Binary(_) => "BINARY",
            Self::Interval { .. } => "INTERVAL",
        }
    }
}

/// Node of a relational predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a table column by its index in the schema.
    Column(usize),
    Literal(Literal),
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Any other function or operator call.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    #[must_use]
    pub fn column(index: usize) -> Self {
        Self::Column(index)
    }

    #[must_use]
    pub fn literal(literal: Literal) -> Self {
        Self::Literal(literal)
    }

    #[must_use]
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `column <op> literal`, the only shape eligible for pushdown.
    #[must_use]
    pub fn column_cmp(index: usize, op: CompareOp, literal: Literal) -> Self {
        Self::compare(op, Self::Column(index), Self::Literal(literal))
    }
}
