//! QueryBuilder search.
//!
//! Asset and content-fragment listings are searches too; they build a
//! [`SearchParams`] with fixed filters instead of hitting their own endpoint.

use aem_client::RequestDescriptor;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::args::form_values;
use crate::error::Result;
use crate::tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolResult, search_scope,
};

/// QueryBuilder endpoint.
pub const QUERY_BUILDER_PATH: &str = "/bin/querybuilder.json";

/// Page size when the caller does not supply `limit`.
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// QueryBuilder's `p.limit` value for "every match".
pub const UNLIMITED: i64 = -1;

/// Argument keys with a dedicated meaning; never passed through as extras.
const RECOGNIZED_KEYS: &[&str] = &[
    "fulltext", "path", "type", "orderby", "limit", "offset", "p.limit", "p.offset",
];

/// A QueryBuilder query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub fulltext: Option<String>,
    pub path: Option<String>,
    pub node_type: Option<String>,
    pub orderby: Option<String>,
    /// Page size; [`UNLIMITED`] returns every match.
    pub limit: i64,
    pub offset: u64,
    /// Caller-supplied predicates, emitted verbatim after the recognized ones.
    pub extra: Vec<(String, String)>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            fulltext: None,
            path: None,
            node_type: None,
            orderby: None,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
            extra: Vec::new(),
        }
    }
}

impl SearchParams {
    /// Append a passthrough predicate.
    pub fn predicate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    pub fn request(&self) -> RequestDescriptor {
        let recognized = [
            ("path", &self.path),
            ("type", &self.node_type),
            ("fulltext", &self.fulltext),
            ("orderby", &self.orderby),
        ];

        let mut request = RequestDescriptor::get(QUERY_BUILDER_PATH);
        for (key, value) in recognized {
            if let Some(value) = value {
                request = request.query(key, value);
            }
        }
        request = request
            .query("p.limit", self.limit.to_string())
            .query("p.offset", self.offset.to_string());
        for (key, value) in &self.extra {
            request = request.query(key, value);
        }
        request
    }
}

impl TryFrom<Value> for SearchParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let path = params
            .optional_str("path")?
            .map(|p| search_scope("path", p))
            .transpose()?;

        let extra = params
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| !RECOGNIZED_KEYS.contains(&key.as_str()))
                    .flat_map(|(key, value)| {
                        form_values(value)
                            .into_iter()
                            .map(move |v| (key.clone(), v))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            fulltext: params.optional_str("fulltext")?.map(str::to_string),
            path,
            node_type: params.optional_str("type")?.map(str::to_string),
            orderby: params.optional_str("orderby")?.map(str::to_string),
            limit: page_limit(&params, DEFAULT_SEARCH_LIMIT)?,
            offset: params.optional_u64("offset", 0)?,
            extra,
        })
    }
}

/// Read `limit`: a positive page size, or -1 for every match.
pub(crate) fn page_limit(params: &Value, default: i64) -> ParamResult<i64> {
    let limit = params.optional_i64("limit", default)?;
    if limit == UNLIMITED || limit > 0 {
        Ok(limit)
    } else {
        Err(ParameterValidationError::out_of_range(
            "limit",
            limit,
            "must be positive, or -1 for all results",
        ))
    }
}

/// Schema fragment shared by every paginated listing.
pub(crate) fn pagination_schema(default_limit: i64) -> (Value, Value) {
    (
        json!({
            "type": "integer",
            "minimum": UNLIMITED,
            "not": {"const": 0},
            "description": format!(
                "Maximum number of results (default {}, -1 for all)",
                default_limit
            )
        }),
        json!({
            "type": "integer",
            "minimum": 0,
            "description": "Number of results to skip (default 0)"
        }),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Search Tool
// ─────────────────────────────────────────────────────────────────────────────

/// Free-form QueryBuilder search.
#[derive(Debug, Clone, Default)]
pub struct SearchTool;

impl SearchTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "aem_search"
    }

    fn description(&self) -> &str {
        "Search AEM content with the QueryBuilder API. Supports full-text, path, node type and \
         ordering filters plus pagination. Any additional arguments are passed through as \
         QueryBuilder predicates (e.g. \"property\": \"jcr:content/cq:template\", \
         \"property.value\": \"/conf/site/settings/wcm/templates/article\")."
    }

    fn parameters(&self) -> Value {
        let (limit, offset) = pagination_schema(DEFAULT_SEARCH_LIMIT);
        json!({
            "type": "object",
            "properties": {
                "fulltext": {
                    "type": "string",
                    "description": "Full-text search term"
                },
                "path": {
                    "type": "string",
                    "description": "Restrict results to this subtree, e.g. /content/mysite"
                },
                "type": {
                    "type": "string",
                    "description": "Node type filter, e.g. cq:Page or dam:Asset"
                },
                "orderby": {
                    "type": "string",
                    "description": "Sort key, e.g. @jcr:content/cq:lastModified"
                },
                "limit": limit,
                "offset": offset
            },
            "additionalProperties": {
                "type": ["string", "number", "boolean", "array"]
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = SearchParams::try_from(params)?;
        let payload = ctx.client.execute(params.request()).await?;
        Ok(ToolResult::from_payload(payload))
    }
}
