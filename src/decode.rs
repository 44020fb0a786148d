//! Row value decoding and wire-column-to-field-name remapping.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    wire::{self, Payload, ValueTag, WireValue},
    Result, TursoError, Value,
};

/// Decodes one wire row value, dispatching on its tag.
///
/// The tag decides which payload slot must be populated; a mismatch is a
/// `RowParse` error rather than a best-effort guess.
pub(crate) fn decode_value(value: WireValue) -> Result<Value> {
    match value.tag {
        ValueTag::Null => Ok(Value::Null),
        ValueTag::Integer => match value.value {
            Some(Payload::Text(text)) => text.parse::<i64>().map(Value::Integer).map_err(|err| {
                TursoError::RowParse(format!("invalid integer value '{text}': {err}"))
            }),
            _ => Err(TursoError::RowParse(
                "integer value must be carried as a string".to_owned(),
            )),
        },
        ValueTag::Float => match value.value {
            Some(Payload::Number(number)) if number.is_finite() => Ok(Value::Float(number)),
            Some(Payload::Number(number)) => Err(TursoError::RowParse(format!(
                "non-finite float value '{number}'"
            ))),
            _ => Err(TursoError::RowParse(
                "float value must be carried as a number".to_owned(),
            )),
        },
        ValueTag::Text => match value.value {
            Some(Payload::Text(text)) => Ok(Value::Text(text)),
            _ => Err(TursoError::RowParse(
                "text value must be carried as a string".to_owned(),
            )),
        },
        ValueTag::Blob => {
            let encoded = match (value.value, value.base64) {
                (Some(Payload::Text(text)), _) => text,
                (_, Some(base64)) => base64,
                _ => {
                    return Err(TursoError::RowParse(
                        "blob value must be carried as base64 text".to_owned(),
                    ))
                }
            };
            BASE64.decode(&encoded).map(Value::Blob).map_err(|err| {
                TursoError::RowParse(format!("invalid base64 blob '{encoded}': {err}"))
            })
        }
        ValueTag::Unknown => Err(TursoError::UnsupportedType(
            "unrecognized row value tag".to_owned(),
        )),
    }
}

/// Decodes every cell of every row.
pub(crate) fn row_values(rows: Vec<Vec<WireValue>>) -> Result<Vec<Vec<Value>>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(decode_value).collect())
        .collect()
}

/// Builds one JSON object per row, remapping wire column names to field names.
///
/// The map goes field name → wire column name, so remapping is a reverse
/// lookup; a wire column no field maps to keeps its own name as the key.
pub(crate) fn remap_rows(
    cols: &[wire::Col],
    rows: Vec<Vec<Value>>,
    name_map: &[(&str, &str)],
) -> JsonValue {
    let objects = rows
        .into_iter()
        .map(|row| {
            let mut object = Map::with_capacity(cols.len());
            for (col, value) in cols.iter().zip(row) {
                let key = name_map
                    .iter()
                    .find(|(_, wire_name)| *wire_name == col.name)
                    .map_or(col.name.as_str(), |(field, _)| *field);
                object.insert(key.to_owned(), value_to_json(value));
            }
            JsonValue::Object(object)
        })
        .collect();
    JsonValue::Array(objects)
}

/// Extracts, decodes, and remaps the rows of one execute result into a JSON
/// array ready for generic decoding into a record type.
pub(crate) fn typed_rows(
    result: wire::ExecuteResult,
    name_map: &[(&str, &str)],
) -> Result<JsonValue> {
    let rows = result.rows.ok_or(TursoError::NoRows)?;
    let cols = result.cols.ok_or(TursoError::NoColumns)?;
    let values = row_values(rows)?;
    Ok(remap_rows(&cols, values, name_map))
}

fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(value) => JsonValue::Number(value.into()),
        // Finite by construction; fall back to null rather than panic.
        Value::Float(value) => Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number),
        Value::Text(value) => JsonValue::String(value),
        Value::Blob(bytes) => JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        decode::{decode_value, remap_rows, typed_rows},
        wire::{self, Payload, ValueTag, WireValue},
        TursoError, Value,
    };

    fn text_value(tag: ValueTag, text: &str) -> WireValue {
        WireValue {
            tag,
            value: Some(Payload::Text(text.to_owned())),
            base64: None,
        }
    }

    fn col(name: &str) -> wire::Col {
        wire::Col {
            name: name.to_owned(),
            decltype: None,
        }
    }

    #[test]
    fn decode_dispatches_on_tag() {
        assert_eq!(
            decode_value(text_value(ValueTag::Null, "anything")).expect("must decode"),
            Value::Null
        );
        assert_eq!(
            decode_value(text_value(ValueTag::Integer, "42")).expect("must decode"),
            Value::Integer(42)
        );
        assert_eq!(
            decode_value(WireValue {
                tag: ValueTag::Float,
                value: Some(Payload::Number(1.5)),
                base64: None,
            })
            .expect("must decode"),
            Value::Float(1.5)
        );
        assert_eq!(
            decode_value(text_value(ValueTag::Text, "kit")).expect("must decode"),
            Value::Text("kit".to_owned())
        );
        assert_eq!(
            decode_value(text_value(ValueTag::Blob, "AQID")).expect("must decode"),
            Value::Blob(vec![1, 2, 3])
        );
    }

    #[test]
    fn decode_rejects_slot_mismatches() {
        let integer_in_float_slot = WireValue {
            tag: ValueTag::Integer,
            value: Some(Payload::Number(4.0)),
            base64: None,
        };
        let err = decode_value(integer_in_float_slot).expect_err("must fail");
        assert!(matches!(err, TursoError::RowParse(_)));

        let float_as_string = text_value(ValueTag::Float, "1.5");
        let err = decode_value(float_as_string).expect_err("must fail");
        assert!(matches!(err, TursoError::RowParse(_)));
    }

    #[test]
    fn decode_rejects_bad_integer_and_bad_base64() {
        let err = decode_value(text_value(ValueTag::Integer, "nope")).expect_err("must fail");
        assert!(matches!(err, TursoError::RowParse(_)));

        let err = decode_value(text_value(ValueTag::Blob, "!!!")).expect_err("must fail");
        assert!(matches!(err, TursoError::RowParse(_)));
    }

    #[test]
    fn decode_unknown_tag_is_unsupported() {
        let err = decode_value(text_value(ValueTag::Unknown, "x")).expect_err("must fail");
        assert!(matches!(err, TursoError::UnsupportedType(_)));
    }

    #[test]
    fn remap_uses_reverse_lookup_and_passes_unmapped_through() {
        let cols = [col("id"), col("username"), col("email")];
        let rows = vec![vec![
            Value::Text("1".to_owned()),
            Value::Text("kit".to_owned()),
            Value::Text("k@k.com".to_owned()),
        ]];
        let map = [
            ("identify", "id"),
            ("name", "username"),
            ("email_address", "email"),
        ];

        let remapped = remap_rows(&cols, rows, &map);
        assert_eq!(
            remapped,
            json!([{ "identify": "1", "name": "kit", "email_address": "k@k.com" }])
        );

        let unmapped = remap_rows(&[col("id"), col("extra")], vec![vec![
            Value::Integer(1),
            Value::Null,
        ]], &map);
        assert_eq!(unmapped, json!([{ "identify": 1, "extra": null }]));
    }

    #[test]
    fn blob_values_remap_to_byte_arrays() {
        let remapped = remap_rows(&[col("meta")], vec![vec![Value::Blob(vec![104, 105])]], &[]);
        assert_eq!(remapped, json!([{ "meta": [104, 105] }]));
    }

    #[test]
    fn typed_rows_requires_rows_and_cols() {
        let err = typed_rows(
            wire::ExecuteResult {
                rows: None,
                cols: Some(vec![col("id")]),
                ..Default::default()
            },
            &[],
        )
        .expect_err("must fail");
        assert!(matches!(err, TursoError::NoRows));

        let err = typed_rows(
            wire::ExecuteResult {
                rows: Some(vec![vec![]]),
                cols: None,
                ..Default::default()
            },
            &[],
        )
        .expect_err("must fail");
        assert!(matches!(err, TursoError::NoColumns));
    }
}
