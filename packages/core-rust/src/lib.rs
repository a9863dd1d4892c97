//! `resttable` core: field model, filter pushdown, response readers, and the
//! paginated row cursor.

pub mod context;
pub mod convert;
pub mod cursor;
pub mod filter;
pub mod reader;
pub mod request;
pub mod schema;
pub mod types;

pub use context::ExecutionContext;
pub use convert::{convert, convert_from};
pub use cursor::{CursorError, CursorState, PageSource, RowCursor};
pub use filter::{
    plan_pushdown, CompareOp, CriterionGroups, DeclineReason, Expr, FilterCriterion, FilterGroups,
    FilterTranslator, Literal, Pushdown, PushdownPlan, TranslateError,
};
pub use reader::{ResponseFormat, Row, RowReader};
pub use request::{RenderError, TemplateContext};
pub use schema::{Field, Projection, Schema, SchemaError};
pub use types::{Direction, ScalarType, Value};
