//! Errors surfaced to A2A callers as JSON-RPC error objects.

use crate::a2a::types::{JsonRpcResponse, TaskState, error_codes};

#[derive(Debug, thiserror::Error)]
pub enum A2aError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cannot cancel task in {0:?} state")]
    TaskNotCancelable(TaskState),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl A2aError {
    pub fn code(&self) -> i32 {
        match self {
            A2aError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            A2aError::TaskNotFound(_) => error_codes::TASK_NOT_FOUND,
            A2aError::TaskNotCancelable(_) => error_codes::TASK_NOT_CANCELABLE,
            A2aError::UnsupportedOperation(_) => error_codes::UNSUPPORTED_OPERATION,
            A2aError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn into_response(self, id: serde_json::Value) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string())
    }
}

impl From<serde_json::Error> for A2aError {
    fn from(e: serde_json::Error) -> Self {
        A2aError::InvalidParams(e.to_string())
    }
}
