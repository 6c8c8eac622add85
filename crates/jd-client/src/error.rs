// crates/jd-client/src/error.rs

use jd_core::{ErrorCode, RpcError};
use thiserror::Error;

/// Client-side failure of a single call.
///
/// Cloneable so a batch-level failure can be handed to every call in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The HTTP request could not be sent or its body not read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with something that is not a batch response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The procedure itself failed on the server.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Input/output did not match the contract types, or bad client setup.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Server error code, when the failure came from the procedure.
    pub fn rpc_code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Rpc(err) => Some(err.code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
