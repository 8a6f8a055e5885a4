//! AEM content operations as named tools.
//!
//! Every operation is a [`Tool`] with a JSON Schema for its arguments and a
//! pure mapping from validated arguments to an HTTP request. The
//! [`ToolRegistry`] validates arguments before any tool runs and folds every
//! failure into a [`ToolResult::Error`], so callers always get a result back.

pub mod args;
pub mod error;
pub mod schema;
pub mod tool;
pub mod tools;

pub use args::{ElementMap, PropertyMap, StringOrList};
pub use error::{Result, ToolError};
pub use tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolDefinition,
    ToolRegistry, ToolResult,
};
pub use tools::register_all;
