// crates/jd-core/src/wire.rs
//
// Batched-JSON wire format shared by the server and the transport client.
//
// A batch is addressed as `/api/trpc/<path>,<path>,...?batch=1`. Inputs travel
// as an object keyed by call position ("0", "1", ...), in the `input` query
// parameter for GET and as the body for POST. The response is an array of
// envelopes in the same order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, RpcError};
use crate::procedure::ProcedureKind;

/// Path suffix of the RPC endpoint.
pub const RPC_PATH: &str = "/api/trpc";

/// Separator between procedure paths in a batch URL.
pub const PATH_SEPARATOR: char = ',';

/// The two HTTP methods the endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    /// Procedure kind this method carries: GET for queries, POST for mutations.
    pub fn procedure_kind(self) -> ProcedureKind {
        match self {
            HttpMethod::Get => ProcedureKind::Query,
            HttpMethod::Post => ProcedureKind::Mutation,
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// `{"data": ...}` part of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub data: Value,
}

/// Machine-readable part of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub code: ErrorCode,
    pub http_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Error envelope body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub message: String,
    /// JSON-RPC numeric code.
    pub code: i32,
    pub data: ErrorData,
}

/// One entry of a batched response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Result { result: ResultData },
    Error { error: ErrorShape },
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        ResponseEnvelope::Result {
            result: ResultData { data },
        }
    }

    pub fn failure(path: Option<&str>, err: &RpcError) -> Self {
        ResponseEnvelope::Error {
            error: ErrorShape {
                message: err.message.clone(),
                code: err.code.json_rpc_code(),
                data: ErrorData {
                    code: err.code,
                    http_status: err.code.http_status(),
                    path: path.map(str::to_string),
                },
            },
        }
    }

    pub fn from_outcome(path: &str, outcome: Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(Some(path), &err),
        }
    }

    /// Status this entry alone would warrant.
    pub fn http_status(&self) -> u16 {
        match self {
            ResponseEnvelope::Result { .. } => 200,
            ResponseEnvelope::Error { error } => error.data.http_status,
        }
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self {
            ResponseEnvelope::Result { result } => Ok(result.data),
            ResponseEnvelope::Error { error } => Err(RpcError::new(error.data.code, error.message)),
        }
    }
}

/// HTTP status of a whole batch response.
///
/// 200 when every call succeeded, the shared status when every call failed with
/// the same one, 207 for anything mixed.
pub fn batch_status(envelopes: &[ResponseEnvelope]) -> u16 {
    let mut statuses = envelopes.iter().map(ResponseEnvelope::http_status);
    let first = match statuses.next() {
        Some(s) => s,
        None => return 200,
    };
    if statuses.all(|s| s == first) {
        first
    } else {
        207
    }
}

// ---------------------------------------------------------------------------
// Paths and inputs
// ---------------------------------------------------------------------------

/// Join procedure paths into the batch URL segment.
pub fn join_paths<S: AsRef<str>>(paths: &[S]) -> String {
    paths
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// Split the batch URL segment back into procedure paths.
pub fn split_paths(segment: &str) -> Vec<String> {
    segment
        .split(PATH_SEPARATOR)
        .map(|p| p.trim().to_string())
        .collect()
}

/// Encode per-call inputs as `{"0": .., "1": ..}`. `None` and `null` inputs are
/// omitted. Returns `None` when no call carries an input.
pub fn encode_batch_input(inputs: &[Option<Value>]) -> Option<Value> {
    let map: Map<String, Value> = inputs
        .iter()
        .enumerate()
        .filter_map(|(i, input)| match input {
            Some(Value::Null) | None => None,
            Some(v) => Some((i.to_string(), v.clone())),
        })
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Decode the batch input object into one value per call. Missing keys yield
/// `null`.
pub fn decode_batch_input(raw: Option<Value>, count: usize) -> Result<Vec<Value>, RpcError> {
    let mut map = match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(RpcError::bad_request(format!(
                "Batch input must be an object keyed by call index, got {}",
                json_type_name(&other)
            )))
        }
    };

    Ok((0..count)
        .map(|i| map.remove(&i.to_string()).unwrap_or(Value::Null))
        .collect())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_shape() {
        let ok = serde_json::to_value(ResponseEnvelope::success(json!("Hello"))).unwrap();
        assert_eq!(ok, json!({ "result": { "data": "Hello" } }));

        let err = ResponseEnvelope::failure(Some("example.nope"), &RpcError::not_found("missing"));
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(
            err,
            json!({
                "error": {
                    "message": "missing",
                    "code": -32004,
                    "data": { "code": "NOT_FOUND", "httpStatus": 404, "path": "example.nope" }
                }
            })
        );
    }

    #[test]
    fn test_envelope_parses_back() {
        let raw = json!([
            { "result": { "data": null } },
            { "error": { "message": "boom", "code": -32603,
                         "data": { "code": "INTERNAL_SERVER_ERROR", "httpStatus": 500 } } }
        ]);
        let envelopes: Vec<ResponseEnvelope> = serde_json::from_value(raw).unwrap();
        assert_eq!(envelopes[0].clone().into_result().unwrap(), Value::Null);
        let err = envelopes[1].clone().into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_batch_status() {
        let ok = ResponseEnvelope::success(json!(1));
        let missing = ResponseEnvelope::failure(None, &RpcError::not_found("x"));
        assert_eq!(batch_status(&[ok.clone(), ok.clone()]), 200);
        assert_eq!(batch_status(&[missing.clone(), missing.clone()]), 404);
        assert_eq!(batch_status(&[ok, missing]), 207);
        assert_eq!(batch_status(&[]), 200);
    }

    #[test]
    fn test_batch_input_omits_absent_inputs() {
        let encoded = encode_batch_input(&[Some(json!({ "name": "a" })), None, Some(Value::Null)]);
        assert_eq!(encoded, Some(json!({ "0": { "name": "a" } })));
        assert_eq!(encode_batch_input(&[None, None]), None);

        let decoded = decode_batch_input(encoded, 3).unwrap();
        assert_eq!(decoded, vec![json!({ "name": "a" }), Value::Null, Value::Null]);
    }

    #[test]
    fn test_batch_input_must_be_object() {
        let err = decode_batch_input(Some(json!([1, 2])), 2).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
    }

    #[test]
    fn test_paths() {
        let joined = join_paths(&["example.hello", "session.getSession"]);
        assert_eq!(joined, "example.hello,session.getSession");
        assert_eq!(split_paths(&joined), vec!["example.hello", "session.getSession"]);
    }
}
