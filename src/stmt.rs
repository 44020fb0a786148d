//! Statement splitting, positional argument binding, and request assembly.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{
    wire::{Payload, PipelineRequest, Request, Stmt, ValueTag, WireValue},
    Arg, Result, TursoError,
};

/// Rejects SQL that contains more than one `;`-delimited statement.
///
/// Single-statement entry points call this before any network work; only
/// batch/transaction framing is allowed to produce multi-statement SQL.
pub(crate) fn ensure_single_statement(sql: &str) -> Result<()> {
    if segments(sql).count() > 1 {
        return Err(TursoError::InvalidSql(sql.to_owned()));
    }
    Ok(())
}

/// Splits multi-statement SQL and distributes `args` across the statements.
///
/// Arguments bind strictly positionally: each segment consumes as many
/// arguments from the front of the list as it has `?` placeholders. A
/// shortfall or surplus is an error, never an out-of-range access.
pub(crate) fn split_statements(sql: &str, args: Vec<Arg>) -> Result<Vec<Stmt>> {
    let mut remaining = args.into_iter();
    let mut statements = Vec::new();

    for (index, segment) in segments(sql).enumerate() {
        let placeholders = segment.matches('?').count();
        let bound: Vec<Arg> = remaining.by_ref().take(placeholders).collect();
        if bound.len() < placeholders {
            return Err(TursoError::MissingValue(format!(
                "statement {index} has {placeholders} placeholders but only {} arguments remain",
                bound.len()
            )));
        }
        let args = bound
            .into_iter()
            .map(encode_arg)
            .collect::<Result<Vec<_>>>()?;
        statements.push(Stmt {
            sql: segment.to_owned(),
            args,
        });
    }

    let surplus = remaining.count();
    if surplus > 0 {
        return Err(TursoError::InvalidValue(format!(
            "{surplus} arguments left over after binding all placeholders"
        )));
    }

    Ok(statements)
}

/// Wraps statements as execute directives followed by one close directive.
///
/// The close directive always ends the server-side session after this round
/// trip; an optional baton is passed through unchanged.
pub(crate) fn build_pipeline_request(
    statements: Vec<Stmt>,
    baton: Option<String>,
) -> PipelineRequest {
    let mut requests: Vec<Request> = statements
        .into_iter()
        .map(|stmt| Request::Execute { stmt })
        .collect();
    requests.push(Request::Close {});
    PipelineRequest { baton, requests }
}

/// Encodes one application argument into its tagged wire form.
///
/// A `None` payload in any typed variant collapses to the `null` tag, same
/// as an explicit [`Arg::Null`]. Non-finite floats are rejected since JSON
/// cannot carry them.
pub(crate) fn encode_arg(arg: Arg) -> Result<WireValue> {
    let value = match arg {
        Arg::Null
        | Arg::Integer(None)
        | Arg::Float(None)
        | Arg::Text(None)
        | Arg::Blob(None) => null_wire_value(),
        Arg::Integer(Some(value)) => WireValue {
            tag: ValueTag::Integer,
            value: Some(Payload::Text(value.to_string())),
            base64: None,
        },
        Arg::Float(Some(value)) => {
            if !value.is_finite() {
                return Err(TursoError::InvalidValue(format!(
                    "non-finite float argument '{value}'"
                )));
            }
            WireValue {
                tag: ValueTag::Float,
                value: Some(Payload::Number(value)),
                base64: None,
            }
        }
        Arg::Text(Some(value)) => WireValue {
            tag: ValueTag::Text,
            value: Some(Payload::Text(value)),
            base64: None,
        },
        Arg::Blob(Some(bytes)) => WireValue {
            tag: ValueTag::Blob,
            value: None,
            base64: Some(BASE64.encode(bytes)),
        },
    };
    Ok(value)
}

fn null_wire_value() -> WireValue {
    // The server expects the literal string "null" in the value slot.
    WireValue {
        tag: ValueTag::Null,
        value: Some(Payload::Text("null".to_owned())),
        base64: None,
    }
}

fn segments(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').filter(|segment| !segment.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use crate::{
        stmt::{build_pipeline_request, encode_arg, ensure_single_statement, split_statements},
        wire::{Payload, Request, ValueTag},
        Arg, TursoError,
    };

    #[test]
    fn encode_null_variants_collapse_to_null_tag() {
        for arg in [
            Arg::Null,
            Arg::Integer(None),
            Arg::Float(None),
            Arg::Text(None),
            Arg::Blob(None),
        ] {
            let encoded = encode_arg(arg).expect("must encode");
            assert_eq!(encoded.tag, ValueTag::Null);
            assert_eq!(encoded.value, Some(Payload::Text("null".to_owned())));
        }
    }

    #[test]
    fn encode_typed_payloads() {
        let integer = encode_arg(Arg::integer(-12)).expect("must encode");
        assert_eq!(integer.value, Some(Payload::Text("-12".to_owned())));

        let float = encode_arg(Arg::float(2.5)).expect("must encode");
        assert_eq!(float.value, Some(Payload::Number(2.5)));

        let text = encode_arg(Arg::text("kit")).expect("must encode");
        assert_eq!(text.value, Some(Payload::Text("kit".to_owned())));

        let blob = encode_arg(Arg::blob(vec![1, 2, 3])).expect("must encode");
        assert_eq!(blob.base64.as_deref(), Some("AQID"));
        assert_eq!(blob.value, None);
    }

    #[test]
    fn encode_rejects_non_finite_float() {
        let err = encode_arg(Arg::float(f64::NAN)).expect_err("must fail");
        assert!(matches!(err, TursoError::InvalidValue(_)));
    }

    #[test]
    fn split_distributes_args_in_order() {
        let statements = split_statements(
            "INSERT INTO t VALUES (?, ?); DELETE FROM t WHERE id = ?;",
            vec![Arg::integer(1), Arg::text("a"), Arg::integer(2)],
        )
        .expect("must split");

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql, "INSERT INTO t VALUES (?, ?)");
        assert_eq!(statements[0].args.len(), 2);
        assert_eq!(statements[1].args.len(), 1);
        assert_eq!(
            statements[1].args[0].value,
            Some(Payload::Text("2".to_owned()))
        );
    }

    #[test]
    fn split_rejoin_reassembles_the_batch() {
        let sql = "SELECT a FROM t WHERE id = ?; UPDATE t SET a = ? WHERE id = ?";
        let statements =
            split_statements(sql, vec![Arg::integer(1), Arg::text("x"), Arg::integer(1)])
                .expect("must split");
        let rejoined = statements
            .iter()
            .map(|stmt| stmt.sql.trim())
            .collect::<Vec<_>>()
            .join("; ");
        assert_eq!(rejoined, sql);
    }

    #[test]
    fn split_fails_cleanly_on_missing_args() {
        let err = split_statements("SELECT ?; SELECT ?", vec![Arg::integer(1)])
            .expect_err("must fail");
        assert!(matches!(err, TursoError::MissingValue(_)));
    }

    #[test]
    fn split_fails_on_leftover_args() {
        let err = split_statements("SELECT 1", vec![Arg::integer(1)]).expect_err("must fail");
        assert!(matches!(err, TursoError::InvalidValue(_)));
    }

    #[test]
    fn empty_sql_yields_no_statements() {
        let statements = split_statements("", Vec::new()).expect("must split");
        assert!(statements.is_empty());
    }

    #[test]
    fn single_statement_guard() {
        ensure_single_statement("SELECT 1").expect("single statement is fine");
        ensure_single_statement("SELECT 1;").expect("trailing separator is fine");
        let err = ensure_single_statement("SELECT 1; SELECT 2").expect_err("must fail");
        assert!(matches!(err, TursoError::InvalidSql(_)));
    }

    #[test]
    fn request_builder_appends_close_and_keeps_baton() {
        let statements = split_statements("SELECT 1; SELECT 2", Vec::new()).expect("must split");
        let request = build_pipeline_request(statements, Some("tok".to_owned()));

        assert_eq!(request.baton.as_deref(), Some("tok"));
        assert_eq!(request.requests.len(), 3);
        assert!(matches!(request.requests[0], Request::Execute { .. }));
        assert!(matches!(request.requests[2], Request::Close {}));
    }
}
