//! Built-in AEM tools.
//!
//! - Pages: read, list, create, update properties, delete
//! - Search: QueryBuilder with passthrough predicates
//! - Assets: metadata, renditions, listing
//! - Content fragments: read, list, create, update, delete
//! - Replication: publish / unpublish
//! - Diagnostics: connectivity check

mod assets;
mod diagnostics;
mod fragments;
mod pages;
mod replication;
mod search;

use serde_json::{Value, json};

use crate::tool::{ParamExt, ParameterValidationError, ToolRegistry, repository_path};

// Page tools
pub use pages::{
    CreatePageParams, CreatePageTool, DeletePageParams, DeletePageTool, GetPageTool,
    ListPagesTool, UpdatePagePropertiesParams, UpdatePagePropertiesTool, derive_page_label,
};

// Search tool
pub use search::{
    DEFAULT_SEARCH_LIMIT, QUERY_BUILDER_PATH, SearchParams, SearchTool, UNLIMITED,
};

// Asset tools
pub use assets::{
    DEFAULT_ASSET_LIMIT, DEFAULT_DAM_ROOT, GetAssetMetadataTool, GetAssetRenditionsTool,
    ListAssetsTool,
};

// Content fragment tools
pub use fragments::{
    ASSETS_API_PREFIX, CreateContentFragmentParams, CreateContentFragmentTool,
    DeleteContentFragmentTool, GetContentFragmentTool, ListContentFragmentsTool,
    UpdateContentFragmentParams, UpdateContentFragmentTool,
};

// Replication tool
pub use replication::{REPLICATE_PATH, ReplicateParams, ReplicateTool, ReplicationAction};

// Diagnostics tool
pub use diagnostics::{CheckConnectionTool, CheckOutcome, ConnectionReport, check_connection};

/// Register every AEM tool.
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(GetPageTool);
    registry.register(ListPagesTool);
    registry.register(CreatePageTool);
    registry.register(UpdatePagePropertiesTool);
    registry.register(DeletePageTool);
    registry.register(SearchTool);
    registry.register(GetAssetMetadataTool);
    registry.register(GetAssetRenditionsTool);
    registry.register(ListAssetsTool);
    registry.register(GetContentFragmentTool);
    registry.register(ListContentFragmentsTool);
    registry.register(CreateContentFragmentTool);
    registry.register(UpdateContentFragmentTool);
    registry.register(DeleteContentFragmentTool);
    registry.register(ReplicateTool);
    registry.register(CheckConnectionTool);
}

impl ToolRegistry {
    /// A registry holding every AEM tool.
    pub fn with_aem_tools() -> Self {
        let mut registry = Self::new();
        register_all(&mut registry);
        registry
    }
}

/// `charset` marker sent with every form-encoded write.
pub(crate) const CHARSET_FIELD: (&str, &str) = ("_charset_", "utf-8");

/// Arguments of tools that take only a repository path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathParams {
    pub path: String,
}

impl TryFrom<Value> for PathParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let path = params.required_str("path", "provide an absolute repository path")?;
        Ok(Self {
            path: repository_path("path", path)?,
        })
    }
}

/// Schema for a single required `path` argument.
pub(crate) fn path_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "minLength": 1,
                "description": description
            }
        },
        "required": ["path"]
    })
}

/// Standard result of a successful write.
pub(crate) fn write_success(path: &str) -> Value {
    json!({ "success": true, "path": path })
}
