/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TursoError {
    /// The database URL could not be parsed.
    #[error("invalid database url '{0}'")]
    InvalidUrl(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body did not match the pipeline schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// SQL error reported by the server for one statement.
    #[error("sql error at statement {index}: {message}")]
    Statement {
        /// Position of the failing statement in the pipeline payload.
        index: usize,
        /// Error message text from the server.
        message: String,
    },
    /// `query_one` found more rows than the single row it expects.
    #[error("expected at most one row, got {0}")]
    InvalidRowCount(usize),
    /// A row value could not be decoded.
    #[error("row parse error: {0}")]
    RowParse(String),
    /// A row value carried a type tag this client does not know.
    #[error("unsupported value type '{0}'")]
    UnsupportedType(String),
    /// Fewer arguments were supplied than the SQL has placeholders.
    #[error("missing value: {0}")]
    MissingValue(String),
    /// An argument was rejected or left over after binding.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A row-producing operation received a result without rows.
    #[error("result contains no rows")]
    NoRows,
    /// A row-producing operation received rows without column metadata.
    #[error("result contains no columns")]
    NoColumns,
    /// Multi-statement SQL was passed to a single-statement entry point.
    #[error("multi-statement sql passed to a single-statement call: {0}")]
    InvalidSql(String),
}
