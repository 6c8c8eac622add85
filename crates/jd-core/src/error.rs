// crates/jd-core/src/error.rs
//
// Per-call RPC error taxonomy. Codes mirror the JSON-RPC numbering used on the
// wire together with the HTTP status each code maps to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes a procedure call can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request body or input could not be parsed as JSON.
    ParseError,
    /// The input was well-formed JSON but failed deserialization or validation.
    BadRequest,
    /// No procedure is registered under the requested path.
    NotFound,
    /// The procedure exists but not for this HTTP method / procedure kind.
    MethodNotSupported,
    /// Handler failure or unreachable integration (identity provider, database).
    InternalServerError,
}

impl ErrorCode {
    /// JSON-RPC numeric code carried in the error envelope.
    pub fn json_rpc_code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::BadRequest => -32600,
            ErrorCode::InternalServerError => -32603,
            ErrorCode::NotFound => -32004,
            ErrorCode::MethodNotSupported => -32005,
        }
    }

    /// HTTP status associated with this code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::ParseError | ErrorCode::BadRequest => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotSupported => 405,
            ErrorCode::InternalServerError => 500,
        }
    }

    /// Wire name, e.g. `"NOT_FOUND"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed procedure call. Surfaces to the client as a per-call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn method_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotSupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// An external collaborator (identity provider, database) failed.
    ///
    /// Reported to callers as `INTERNAL_SERVER_ERROR`; never retried here.
    pub fn integration(service: &str, detail: impl std::fmt::Display) -> Self {
        Self::internal(format!("{} unavailable: {}", service, detail))
    }
}
