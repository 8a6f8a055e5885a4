//! Error types for the MCP server.

use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Faults in the transport itself. Malformed messages are answered with
/// JSON-RPC error objects and never surface here.
#[derive(Debug, Error)]
pub enum McpError {
    /// Reading stdin or writing stdout failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The writer task went away before the reader finished.
    #[error("connection closed")]
    ConnectionClosed,
}
