//! Forward-only row cursor over a paginated remote result.
//!
//! A [`RowCursor`] walks the rows of the current page and pulls the next page
//! from its [`PageSource`] when the current one is consumed. An empty page
//! ends the result.

use std::sync::Arc;

use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::context::ExecutionContext;
use crate::convert::{convert, convert_from};
use crate::reader::Row;
use crate::schema::{Field, Projection, Schema, SchemaError};
use crate::types::Value;

/// Supplier of successive result pages.
///
/// Returning an empty page signals the end of the result.
pub trait PageSource {
    /// Fetches the page following the last one returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched or decoded.
    fn next_page(&mut self) -> anyhow::Result<Vec<Row>>;
}

impl<F> PageSource for F
where
    F: FnMut() -> anyhow::Result<Vec<Row>>,
{
    fn next_page(&mut self) -> anyhow::Result<Vec<Row>> {
        self()
    }
}

/// Position of a [`RowCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No current row: before the first row, or after a restart.
    Fresh,
    /// On a row; [`RowCursor::current_row`] succeeds.
    Positioned,
    /// The source returned an empty page. Terminal.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is not positioned on a row (state {state:?})")]
    NotPositioned { state: CursorState },
    #[error("cursor has been released")]
    Released,
}

/// Cursor producing projected, typed tuples from remote pages.
pub struct RowCursor<S> {
    schema: Arc<Schema>,
    projection: Projection,
    context: ExecutionContext,
    source: S,
    page: Vec<Row>,
    next_index: usize,
    current: Option<usize>,
    state: CursorState,
    released: bool,
}

impl<S: PageSource> RowCursor<S> {
    /// Creates a cursor positioned before the first row of `initial_page`.
    ///
    /// `projection` selects schema field indices in output order; `None`
    /// emits every field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ProjectionOutOfRange`] for an invalid index.
    pub fn new(
        schema: Arc<Schema>,
        projection: Option<&[usize]>,
        context: ExecutionContext,
        initial_page: Vec<Row>,
        source: S,
    ) -> Result<Self, SchemaError> {
        let projection = Projection::new(&schema, projection)?;
        Ok(Self {
            schema,
            projection,
            context,
            source,
            page: initial_page,
            next_index: 0,
            current: None,
            state: CursorState::Fresh,
            released: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Moves to the next row, fetching the next page when the current one
    /// is consumed.
    ///
    /// Returns `false` once the result is exhausted or the cursor released;
    /// later calls keep returning `false` without touching the source.
    ///
    /// # Errors
    ///
    /// Propagates page source failures. The cursor position is unchanged on
    /// error, so the call may be retried.
    pub fn advance(&mut self) -> anyhow::Result<bool> {
        if self.released || self.state == CursorState::Exhausted {
            return Ok(false);
        }

        if self.next_index >= self.page.len() {
            let page = self.source.next_page()?;
            if page.is_empty() {
                debug!(
                    execution_id = %self.context.execution_id,
                    "result exhausted"
                );
                self.page.clear();
                self.next_index = 0;
                self.current = None;
                self.state = CursorState::Exhausted;
                return Ok(false);
            }
            trace!(rows = page.len(), "fetched next page");
            self.page = page;
            self.next_index = 0;
        }

        self.current = Some(self.next_index);
        self.next_index += 1;
        self.state = CursorState::Positioned;
        Ok(true)
    }

    /// Materializes the current row as a tuple in projection order.
    ///
    /// Response fields are read from the row and converted to their declared
    /// type. Request-only fields take the value bound during filter
    /// translation, or null when nothing was bound.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when the cursor is not on a row.
    pub fn current_row(&self) -> Result<Vec<Value>, CursorError> {
        if self.released {
            return Err(CursorError::Released);
        }
        let (CursorState::Positioned, Some(index)) = (self.state, self.current) else {
            return Err(CursorError::NotPositioned { state: self.state });
        };
        let Some(row) = self.page.get(index) else {
            return Err(CursorError::NotPositioned { state: self.state });
        };

        Ok(self
            .projection
            .indices()
            .iter()
            .map(|&i| {
                self.schema
                    .field(i)
                    .map_or(Value::Null, |field| self.materialize(field, row, index))
            })
            .collect())
    }

    fn materialize(&self, field: &Field, row: &Row, row_index: usize) -> Value {
        if field.direction.has_response_value() {
            let raw = row.field(row_index, field.extraction_path());
            convert_from(row.format(), &raw, field.ty)
        } else {
            let raw = self
                .context
                .bound_value(&field.name)
                .map_or(Json::Null, Value::to_json);
            convert(&raw, field.ty)
        }
    }

    /// Clears the current row without rewinding.
    ///
    /// The next [`advance`](Self::advance) continues after the last row
    /// returned; a remote result cannot be replayed.
    pub fn restart(&mut self) {
        self.current = None;
        if self.state == CursorState::Positioned {
            self.state = CursorState::Fresh;
        }
    }

    /// Marks the cursor released. Calling it again has no effect.
    ///
    /// Only the flag changes; the page source belongs to whoever created it.
    pub fn release(&mut self) {
        if !self.released {
            debug!(execution_id = %self.context.execution_id, "cursor released");
            self.released = true;
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: PageSource> Iterator for RowCursor<S> {
    type Item = anyhow::Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => Some(self.current_row().map_err(anyhow::Error::from)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<S> std::fmt::Debug for RowCursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("execution_id", &self.context.execution_id)
            .field("state", &self.state)
            .field("buffered", &self.page.len().saturating_sub(self.next_index))
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
