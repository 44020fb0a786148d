//! Batch and transaction builders and result demultiplexing.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{
    decode,
    model::{insert_sql_many, insert_sql_one},
    stmt::ensure_single_statement,
    wire, Arg, Database, Insertable, Queryable, Result, TursoError, Value,
};

const INVALID_RESPONSE: &str = "Invalid Response";

/// Outcome of one operation inside a batch or transaction, in the order the
/// operations were appended.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementOutcome {
    /// Raw row tuples from a `query` operation.
    Rows(Vec<Vec<Value>>),
    /// Remapped rows from a `query_as` operation, ready for typed decoding.
    Decoded(DecodedRows),
    /// Affected-row count from an `insert` operation.
    Inserted(u64),
    /// Affected-row count from an `execute` operation.
    Executed(u64),
    /// Statement-level failure; the rest of the batch still has outcomes.
    Error(String),
}

/// Rows of a `query_as` operation with column remapping already applied.
///
/// Typed decoding is deferred to the caller because one batch can mix target
/// types; the column map was captured when the operation was appended.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedRows(JsonValue);

impl DecodedRows {
    pub(crate) fn new(rows: JsonValue) -> Self {
        Self(rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.0.as_array().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the rows into a list of records.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        serde_json::from_value(self.0)
            .map_err(|err| TursoError::RowParse(format!("cannot decode rows: {err}")))
    }
}

#[derive(Debug)]
enum OpKind {
    Query,
    QueryAs {
        column_map: &'static [(&'static str, &'static str)],
    },
    Insert,
    Execute,
}

#[derive(Debug)]
struct Op {
    sql: String,
    args: Vec<Arg>,
    kind: OpKind,
}

#[derive(Debug, Default)]
struct Ops(Vec<Op>);

impl Ops {
    fn push_query(&mut self, sql: String, args: Vec<Arg>) -> Result<()> {
        ensure_single_statement(&sql)?;
        self.0.push(Op {
            sql,
            args,
            kind: OpKind::Query,
        });
        Ok(())
    }

    fn push_query_as<T: Queryable>(&mut self, sql: String, args: Vec<Arg>) -> Result<()> {
        ensure_single_statement(&sql)?;
        self.0.push(Op {
            sql,
            args,
            kind: OpKind::QueryAs {
                column_map: T::column_map(),
            },
        });
        Ok(())
    }

    fn push_insert<T: Insertable>(&mut self, object: &T) {
        let (sql, args) = insert_sql_one(object);
        self.0.push(Op {
            sql,
            args,
            kind: OpKind::Insert,
        });
    }

    fn push_insert_all<T: Insertable>(&mut self, objects: &[T]) -> Result<()> {
        if objects.is_empty() {
            return Ok(());
        }
        let (sql, args) = insert_sql_many(objects)?;
        self.0.push(Op {
            sql,
            args,
            kind: OpKind::Insert,
        });
        Ok(())
    }

    fn push_execute(&mut self, sql: String, args: Vec<Arg>) -> Result<()> {
        ensure_single_statement(&sql)?;
        self.0.push(Op {
            sql,
            args,
            kind: OpKind::Execute,
        });
        Ok(())
    }

    async fn run(self, db: &Database, framed: bool) -> Result<Vec<StatementOutcome>> {
        if framed && self.0.is_empty() {
            return Ok(Vec::new());
        }

        let joined = self
            .0
            .iter()
            .map(|op| op.sql.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let sql = if framed {
            format!("BEGIN TRANSACTION; {joined}; COMMIT;")
        } else {
            joined
        };

        let mut args = Vec::new();
        let mut kinds = Vec::with_capacity(self.0.len());
        for op in self.0 {
            args.extend(op.args);
            kinds.push(op.kind);
        }

        let response = db.request(&sql, args).await?;
        Ok(demux(response.results, &kinds, usize::from(framed)))
    }
}

/// Pairs wire results with the operations that produced them, by position.
///
/// `skip` discards leading framing acknowledgments (the `BEGIN` result of a
/// transaction); trailing results beyond the operation list (`COMMIT`, the
/// close acknowledgment) fall off the end of the zip.
fn demux(
    results: Vec<wire::PipelineResult>,
    kinds: &[OpKind],
    skip: usize,
) -> Vec<StatementOutcome> {
    results
        .into_iter()
        .skip(skip)
        .zip(kinds)
        .map(|(result, kind)| outcome(result, kind))
        .collect()
}

fn outcome(result: wire::PipelineResult, kind: &OpKind) -> StatementOutcome {
    if result.kind != wire::ResultKind::Ok {
        let message = result
            .error
            .map(|error| error.message)
            .unwrap_or_else(|| INVALID_RESPONSE.to_owned());
        return StatementOutcome::Error(message);
    }

    let Some(payload) = result.response.and_then(|envelope| envelope.result) else {
        return StatementOutcome::Error(INVALID_RESPONSE.to_owned());
    };

    match kind {
        OpKind::Query => match payload.rows.map(decode::row_values) {
            Some(Ok(rows)) => StatementOutcome::Rows(rows),
            _ => StatementOutcome::Error(INVALID_RESPONSE.to_owned()),
        },
        OpKind::QueryAs { column_map } => match decode::typed_rows(payload, column_map) {
            Ok(rows) => StatementOutcome::Decoded(DecodedRows::new(rows)),
            Err(_) => StatementOutcome::Error(INVALID_RESPONSE.to_owned()),
        },
        OpKind::Insert => match payload.affected_row_count {
            Some(count) => StatementOutcome::Inserted(count),
            None => StatementOutcome::Error(INVALID_RESPONSE.to_owned()),
        },
        OpKind::Execute => match payload.affected_row_count {
            Some(count) => StatementOutcome::Executed(count),
            None => StatementOutcome::Error(INVALID_RESPONSE.to_owned()),
        },
    }
}

/// Accumulates operations and sends them as one pipeline request.
///
/// Builders are single-use: [`run`](Batch::run) consumes the batch. Created
/// with [`Database::batch`].
#[derive(Debug)]
pub struct Batch<'db> {
    db: &'db Database,
    ops: Ops,
}

impl<'db> Batch<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            ops: Ops::default(),
        }
    }

    /// Appends a raw-rows query. Rejects multi-statement SQL.
    pub fn query(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_query(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Appends a typed query decoding into `T`. Rejects multi-statement SQL.
    pub fn query_as<T: Queryable>(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_query_as::<T>(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Appends an insert for one record.
    pub fn insert<T: Insertable>(mut self, object: &T) -> Self {
        self.ops.push_insert(object);
        self
    }

    /// Appends one multi-row insert. An empty list appends nothing.
    pub fn insert_all<T: Insertable>(mut self, objects: &[T]) -> Result<Self> {
        self.ops.push_insert_all(objects)?;
        Ok(self)
    }

    /// Appends a non-query statement. Rejects multi-statement SQL.
    pub fn execute(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_execute(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Sends all operations in one request and returns one outcome each.
    pub async fn run(self) -> Result<Vec<StatementOutcome>> {
        self.ops.run(self.db, false).await
    }
}

/// A [`Batch`] whose statements run inside `BEGIN TRANSACTION`/`COMMIT`.
///
/// The transaction is all-or-nothing at the SQL level, but outcomes are
/// still reported per statement. Created with [`Database::transaction`].
pub struct Transaction<'db> {
    db: &'db Database,
    ops: Ops,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            ops: Ops::default(),
        }
    }

    /// Appends a raw-rows query. Rejects multi-statement SQL.
    pub fn query(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_query(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Appends a typed query decoding into `T`. Rejects multi-statement SQL.
    pub fn query_as<T: Queryable>(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_query_as::<T>(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Appends an insert for one record.
    pub fn insert<T: Insertable>(mut self, object: &T) -> Self {
        self.ops.push_insert(object);
        self
    }

    /// Appends one multi-row insert. An empty list appends nothing.
    pub fn insert_all<T: Insertable>(mut self, objects: &[T]) -> Result<Self> {
        self.ops.push_insert_all(objects)?;
        Ok(self)
    }

    /// Appends a non-query statement. Rejects multi-statement SQL.
    pub fn execute(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self> {
        self.ops
            .push_execute(sql.into(), args.into_iter().collect())?;
        Ok(self)
    }

    /// Runs the transaction; the `BEGIN` acknowledgment is discarded before
    /// pairing outcomes. An empty transaction skips the network entirely.
    pub async fn run(self) -> Result<Vec<StatementOutcome>> {
        self.ops.run(self.db, true).await
    }
}
