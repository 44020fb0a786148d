use std::fmt;
use std::time::Duration;

use reqwest::{header, Url};

use crate::{
    decode,
    model::{insert_sql_many, insert_sql_one},
    stmt::{build_pipeline_request, ensure_single_statement, split_statements},
    wire, Arg, Batch, ClientOptions, Insertable, MultiTableInsert, Queryable, Result, Transaction,
    TursoError, Value,
};

/// Connection to one Turso database over the v2 pipeline endpoint.
///
/// Read-only after construction: clones and concurrent calls are safe, each
/// call performs exactly one HTTP round trip.
#[derive(Clone)]
pub struct Database {
    http: reqwest::Client,
    url: Url,
    authorization: String,
    options: ClientOptions,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("url", &self.url.as_str())
            .field("authorization", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl Database {
    /// Connects to a database pipeline endpoint.
    ///
    /// The token may be passed with or without the `Bearer ` prefix.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use turso_http::Database;
    ///
    /// let db = Database::connect(
    ///     "https://my-db-my-org.turso.io/v2/pipeline",
    ///     "my-token",
    /// )?;
    /// # Ok::<(), turso_http::TursoError>(())
    /// ```
    pub fn connect(url: impl AsRef<str>, token: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())
            .map_err(|_| TursoError::InvalidUrl(url.as_ref().to_owned()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            url,
            authorization: normalize_bearer_authorization(token.as_ref()),
            options: ClientOptions::default(),
        })
    }

    /// Connects using the `TURSO_DATABASE_URL` and `TURSO_AUTH_TOKEN`
    /// environment variables.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("TURSO_DATABASE_URL").map_err(|_| {
            TursoError::MissingValue("TURSO_DATABASE_URL environment variable".to_owned())
        })?;
        let token = std::env::var("TURSO_AUTH_TOKEN").map_err(|_| {
            TursoError::MissingValue("TURSO_AUTH_TOKEN environment variable".to_owned())
        })?;
        if token.trim().is_empty() {
            return Err(TursoError::MissingValue(
                "TURSO_AUTH_TOKEN is set but empty".to_owned(),
            ));
        }
        Self::connect(url, token)
    }

    /// Applies client options such as the request timeout.
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Tests the connection with an empty pipeline request.
    pub async fn ping(&self) -> Result<()> {
        self.request("", Vec::new()).await?;
        Ok(())
    }

    /// Executes a single statement and returns the affected-row count.
    pub async fn execute(
        &self,
        sql: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<u64> {
        ensure_single_statement(sql)?;
        self.run_execute(sql, args.into_iter().collect()).await
    }

    /// Runs a single query and returns the rows as decoded value tuples.
    pub async fn query(
        &self,
        sql: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Vec<Vec<Value>>> {
        ensure_single_statement(sql)?;
        let response = self.request(sql, args.into_iter().collect()).await?;
        let result = first_execute_result(response)?;
        match result.rows {
            Some(rows) => decode::row_values(rows),
            None => Ok(Vec::new()),
        }
    }

    /// Runs a single query expected to return at most one row.
    ///
    /// Returns `None` for zero rows and fails with
    /// [`TursoError::InvalidRowCount`] for two or more.
    pub async fn query_one(
        &self,
        sql: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Option<Vec<Value>>> {
        let mut rows = self.query(sql, args).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(TursoError::InvalidRowCount(count)),
        }
    }

    /// Runs a single query and decodes the rows into records.
    ///
    /// Wire column names are remapped through [`Queryable::column_map`]
    /// before decoding.
    pub async fn query_as<T: Queryable>(
        &self,
        sql: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Vec<T>> {
        ensure_single_statement(sql)?;
        let response = self.request(sql, args.into_iter().collect()).await?;
        let result = first_execute_result(response)?;
        let rows = decode::typed_rows(result, T::column_map())?;
        serde_json::from_value(rows)
            .map_err(|err| TursoError::RowParse(format!("cannot decode rows: {err}")))
    }

    /// Like [`Database::query_as`] but returns only the first record.
    pub async fn query_as_one<T: Queryable>(
        &self,
        sql: &str,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Option<T>> {
        Ok(self.query_as(sql, args).await?.into_iter().next())
    }

    /// Inserts one record and returns the affected-row count.
    pub async fn insert<T: Insertable>(&self, object: &T) -> Result<u64> {
        let (sql, args) = insert_sql_one(object);
        self.run_execute(&sql, args).await
    }

    /// Inserts a list of records with one multi-row statement.
    ///
    /// An empty list is a no-op returning 0.
    pub async fn insert_all<T: Insertable>(&self, objects: &[T]) -> Result<u64> {
        if objects.is_empty() {
            return Ok(0);
        }
        let (sql, args) = insert_sql_many(objects)?;
        self.run_execute(&sql, args).await
    }

    /// Inserts into multiple tables with one HTTP request.
    ///
    /// All inserts run inside `BEGIN TRANSACTION`/`COMMIT`; the returned
    /// count sums the affected rows of every insert.
    ///
    /// ```no_run
    /// # use turso_http::{Database, MultiTableInsert};
    /// # async fn demo(db: &Database, users: Vec<impl turso_http::Insertable>) -> turso_http::Result<()> {
    /// let affected = db
    ///     .multi_table_insert(MultiTableInsert::new().add(&users)?)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn multi_table_insert(&self, inserts: MultiTableInsert) -> Result<u64> {
        if inserts.is_empty() {
            return Ok(0);
        }

        let mut sql = String::from("BEGIN TRANSACTION; ");
        let mut args = Vec::new();
        for (insert_sql, insert_args) in inserts.into_inserts() {
            sql.push_str(&insert_sql);
            sql.push_str("; ");
            args.extend(insert_args);
        }
        sql.push_str("COMMIT;");

        self.run_execute(&sql, args).await
    }

    /// Starts an empty batch builder.
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    /// Starts an empty transaction builder.
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Splits, encodes, and sends `sql` as one pipeline request.
    ///
    /// Internal multi-statement paths come through here directly; the
    /// single-statement guard belongs to the public entry points.
    pub(crate) async fn request(
        &self,
        sql: &str,
        args: Vec<Arg>,
    ) -> Result<wire::PipelineResponse> {
        let statements = split_statements(sql, args)?;
        let payload = build_pipeline_request(statements, None);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            statements = payload.requests.len() - 1,
            url = %self.url,
            "sending pipeline request"
        );

        let response = self
            .http
            .post(self.url.clone())
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .json(&payload)
            .send()
            .await
            .map_err(TursoError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(TursoError::Transport)?;
        if !status.is_success() {
            return Err(TursoError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<wire::PipelineResponse>(&body).map_err(|err| {
            TursoError::InvalidResponse(format!("invalid pipeline response JSON: {err}"))
        })
    }

    /// Sends and sums affected-row counts over every result.
    ///
    /// Used by `execute`, the insert helpers, and the multi-table insert; a
    /// result tagged as an error fails the whole call since these paths
    /// have no per-statement outcome list to report into.
    async fn run_execute(&self, sql: &str, args: Vec<Arg>) -> Result<u64> {
        let response = self.request(sql, args).await?;
        let mut affected = 0;
        for (index, result) in response.results.into_iter().enumerate() {
            match result.kind {
                wire::ResultKind::Ok => {
                    affected += result
                        .response
                        .and_then(|envelope| envelope.result)
                        .and_then(|result| result.affected_row_count)
                        .unwrap_or(0);
                }
                wire::ResultKind::Error => return Err(statement_error(index, result.error)),
                wire::ResultKind::Unknown => {
                    return Err(TursoError::InvalidResponse(format!(
                        "unknown result type at index {index}"
                    )))
                }
            }
        }
        Ok(affected)
    }
}

fn first_execute_result(response: wire::PipelineResponse) -> Result<wire::ExecuteResult> {
    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| TursoError::InvalidResponse("empty results list".to_owned()))?;
    match first.kind {
        wire::ResultKind::Ok => first
            .response
            .and_then(|envelope| envelope.result)
            .ok_or_else(|| {
                TursoError::InvalidResponse("missing execute result payload".to_owned())
            }),
        wire::ResultKind::Error => Err(statement_error(0, first.error)),
        wire::ResultKind::Unknown => Err(TursoError::InvalidResponse(
            "unknown result type at index 0".to_owned(),
        )),
    }
}

fn statement_error(index: usize, error: Option<wire::PipelineError>) -> TursoError {
    let message = error
        .map(|error| error.message)
        .unwrap_or_else(|| "missing error payload".to_owned());
    TursoError::Statement { index, message }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
