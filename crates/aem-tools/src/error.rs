//! Error types for tool execution.

use thiserror::Error;

use crate::tool::ParameterValidationError;

/// Tool error type.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments failed validation; no request was issued.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] ParameterValidationError),

    /// The AEM call failed.
    #[error(transparent)]
    Client(#[from] aem_client::Error),

    /// No tool registered under this name.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// The tool's argument schema failed to compile.
    #[error("Tool {0} has an invalid argument schema")]
    InvalidSchema(String),
}

impl ToolError {
    /// HTTP status of a failed AEM call, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::Client(e) => e.status(),
            _ => None,
        }
    }
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
