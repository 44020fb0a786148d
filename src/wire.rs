//! JSON schema of the v2 pipeline protocol.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PipelineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baton: Option<String>,
    pub requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Execute { stmt: Stmt },
    Close {},
}

#[derive(Debug, Serialize)]
pub struct Stmt {
    pub sql: String,
    pub args: Vec<WireValue>,
}

/// Tagged wire value used both for statement arguments and row cells.
///
/// The tag governs interpretation, not the payload shape: every tag except
/// `float` carries its payload in the string slot, `float` carries a JSON
/// number. Blob payloads travel as base64 text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    #[serde(rename = "type")]
    pub tag: ValueTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTag {
    Null,
    Integer,
    Float,
    Text,
    Blob,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Number(f64),
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    #[serde(default)]
    pub baton: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub results: Vec<PipelineResult>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineResult {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default)]
    pub response: Option<ResponseEnvelope>,
    #[serde(default)]
    pub error: Option<PipelineError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Ok,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct PipelineError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub result: Option<ExecuteResult>,
}

#[allow(dead_code)]
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteResult {
    #[serde(default)]
    pub cols: Option<Vec<Col>>,
    #[serde(default)]
    pub rows: Option<Vec<Vec<WireValue>>>,
    #[serde(default)]
    pub affected_row_count: Option<u64>,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Col {
    pub name: String,
    #[serde(default)]
    pub decltype: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Payload, PipelineRequest, Request, ResultKind, Stmt, ValueTag, WireValue};

    #[test]
    fn request_serializes_executes_then_close() {
        let request = PipelineRequest {
            baton: None,
            requests: vec![
                Request::Execute {
                    stmt: Stmt {
                        sql: "SELECT ?".to_owned(),
                        args: vec![WireValue {
                            tag: ValueTag::Integer,
                            value: Some(Payload::Text("1".to_owned())),
                            base64: None,
                        }],
                    },
                },
                Request::Close {},
            ],
        };

        let encoded = serde_json::to_value(&request).expect("must serialize");
        assert_eq!(
            encoded,
            json!({
                "requests": [
                    {
                        "type": "execute",
                        "stmt": { "sql": "SELECT ?", "args": [{ "type": "integer", "value": "1" }] }
                    },
                    { "type": "close" }
                ]
            })
        );
    }

    #[test]
    fn float_payload_is_a_number() {
        let value = WireValue {
            tag: ValueTag::Float,
            value: Some(Payload::Number(1.5)),
            base64: None,
        };
        let encoded = serde_json::to_value(&value).expect("must serialize");
        assert_eq!(encoded, json!({ "type": "float", "value": 1.5 }));
    }

    #[test]
    fn row_value_deserializes_payload_by_shape() {
        let text: WireValue =
            serde_json::from_value(json!({ "type": "integer", "value": "42" }))
                .expect("must deserialize");
        assert_eq!(text.value, Some(Payload::Text("42".to_owned())));

        let number: WireValue = serde_json::from_value(json!({ "type": "float", "value": 4.2 }))
            .expect("must deserialize");
        assert_eq!(number.value, Some(Payload::Number(4.2)));
    }

    #[test]
    fn unknown_tags_do_not_fail_deserialization() {
        let value: WireValue = serde_json::from_value(json!({ "type": "datetime", "value": "x" }))
            .expect("must deserialize");
        assert_eq!(value.tag, ValueTag::Unknown);

        let kind: ResultKind =
            serde_json::from_value(json!("surprise")).expect("must deserialize");
        assert_eq!(kind, ResultKind::Unknown);
    }
}
