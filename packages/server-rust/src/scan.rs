//! Scan driver: filters in, typed rows out.
//!
//! A scan plans filter pushdown against the table schema, builds the
//! template context for the first page, fetches it through the
//! [`Transport`], and hands the rows to a [`RowCursor`] that pulls later
//! pages through an [`HttpPageSource`].

use std::sync::Arc;

use anyhow::Context as _;
use resttable_core::{
    plan_pushdown, ExecutionContext, Expr, FilterTranslator, PageSource, Projection,
    ResponseFormat, Row, RowCursor, Schema, TemplateContext,
};
use tracing::{debug, info_span, warn, Span};
use uuid::Uuid;

use crate::config::{ConnectionConfig, TableConfig};
use crate::error::ScanError;

/// Sends one rendered page request and returns the raw response body.
///
/// Rendering the URL and body from the [`TemplateContext`], authentication,
/// and the HTTP client itself belong to the implementation.
pub trait Transport: Send + Sync {
    /// Fetches the page described by `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and non-success responses.
    fn fetch(&self, connection: &ConnectionConfig, ctx: &TemplateContext)
        -> anyhow::Result<String>;
}

/// A remote REST resource exposed as a relational table.
#[derive(Debug, Clone)]
pub struct RestTable {
    connection: Arc<ConnectionConfig>,
    table: TableConfig,
    schema: Arc<Schema>,
    format: ResponseFormat,
}

impl RestTable {
    /// Validates the configuration and builds the table schema.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] for invalid connection settings and
    /// [`ScanError::Schema`] for duplicate field names.
    pub fn new(connection: ConnectionConfig, table: TableConfig) -> Result<Self, ScanError> {
        connection.validate()?;
        let schema = Arc::new(table.schema()?);
        let format = table.response_format(&connection);
        Ok(Self {
            connection: Arc::new(connection),
            table,
            schema,
            format,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.table.name
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Starts a scan.
    ///
    /// `filters` are the leaf comparisons grouped in the table's configured
    /// [`FilterForm`](crate::config::FilterForm). Pushdown may be partial, so
    /// the host keeps evaluating its own predicates on the returned rows.
    /// `projection` selects schema field indices in output order; `None`
    /// emits every field.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Unanswerable`] when a filter cannot be answered by the
    ///   remote API. No request is sent.
    /// - [`ScanError::Schema`] for an out-of-range projection index.
    /// - [`ScanError::Transport`] when the first page cannot be fetched.
    pub fn scan(
        &self,
        transport: Arc<dyn Transport>,
        filters: Vec<Vec<Expr>>,
        projection: Option<&[usize]>,
    ) -> Result<RowCursor<HttpPageSource>, ScanError> {
        let execution_id = Uuid::new_v4().to_string();
        let span = info_span!("scan", table = %self.table.name, execution_id = %execution_id);
        let _guard = span.enter();

        let projection = Projection::new(&self.schema, projection)?;
        let mut ctx = ExecutionContext::new(execution_id);

        let translator = FilterTranslator::new(&self.schema, &self.connection.name_mapping);
        let plan = plan_pushdown(&translator, &self.table.filter_form.wrap(filters), &mut ctx)?;
        debug!(
            groups = plan.groups.groups().len(),
            residual = plan.residual,
            "pushdown planned"
        );

        let mut template = TemplateContext::first_page(
            self.connection.page_size,
            self.connection.first_page,
            plan.groups,
        );
        template.projects = Some(
            projection
                .names(&self.schema)
                .into_iter()
                .map(|name| self.connection.remote_name(name).to_string())
                .collect(),
        );
        template.values = ctx.values().clone();

        let mut source = HttpPageSource {
            transport,
            connection: Arc::clone(&self.connection),
            template,
            format: self.format,
            array_path: self.table.array_path.clone(),
            pages_fetched: 0,
            span: span.clone(),
        };
        let first = source.fetch_current().map_err(ScanError::Transport)?;

        Ok(RowCursor::new(
            Arc::clone(&self.schema),
            Some(projection.indices()),
            ctx,
            first,
            source,
        )?)
    }
}

/// Offset/limit page source backed by a [`Transport`].
///
/// Each page advances `offset` by `limit` and `pageStart` by one. After
/// `max_pages` fetches the source reports an empty page.
pub struct HttpPageSource {
    transport: Arc<dyn Transport>,
    connection: Arc<ConnectionConfig>,
    template: TemplateContext,
    format: ResponseFormat,
    array_path: String,
    pages_fetched: u32,
    span: Span,
}

impl HttpPageSource {
    /// Context of the most recently requested page.
    #[must_use]
    pub fn template(&self) -> &TemplateContext {
        &self.template
    }

    fn fetch_current(&mut self) -> anyhow::Result<Vec<Row>> {
        let payload = self
            .transport
            .fetch(&self.connection, &self.template)
            .with_context(|| {
                format!(
                    "fetching {} {} at offset {}",
                    self.connection.method, self.connection.url, self.template.offset
                )
            })?;
        self.pages_fetched += 1;
        let rows = self.format.extract_array(&payload, &self.array_path);
        debug!(
            offset = self.template.offset,
            page = self.template.page_start,
            rows = rows.len(),
            "page fetched"
        );
        Ok(rows)
    }
}

impl PageSource for HttpPageSource {
    fn next_page(&mut self) -> anyhow::Result<Vec<Row>> {
        let span = self.span.clone();
        let _guard = span.enter();
        if self.pages_fetched >= self.connection.max_pages {
            warn!(
                max_pages = self.connection.max_pages,
                "page limit reached, ending result early"
            );
            return Ok(Vec::new());
        }

        let previous = self.template.clone();
        self.template.next_page();
        self.fetch_current().inspect_err(|_| {
            self.template = previous;
        })
    }
}

impl std::fmt::Debug for HttpPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageSource")
            .field("url", &self.connection.url)
            .field("offset", &self.template.offset)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
