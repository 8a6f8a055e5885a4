//! Content fragment tools.
//!
//! Fragments live under the Assets HTTP API (`/api/assets`) rather than the
//! WCM command servlet. Listing is a QueryBuilder search for assets flagged
//! as content fragments, optionally narrowed to one model.

use aem_client::RequestDescriptor;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::search::{DEFAULT_SEARCH_LIMIT, SearchParams, page_limit, pagination_schema};
use super::{DEFAULT_DAM_ROOT, PathParams, path_schema, write_success};
use crate::args::{ElementMap, element_map};
use crate::error::Result;
use crate::tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolResult,
    repository_path, search_scope,
};

/// Assets HTTP API prefix.
pub const ASSETS_API_PREFIX: &str = "/api/assets";

fn elements_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "additionalProperties": {
            "type": ["string", "array"],
            "items": {"type": "string"}
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct GetContentFragmentTool;

impl GetContentFragmentTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}{}.json", ASSETS_API_PREFIX, params.path))
    }
}

#[async_trait]
impl Tool for GetContentFragmentTool {
    fn name(&self) -> &str {
        "aem_get_content_fragment"
    }

    fn description(&self) -> &str {
        "Get a content fragment, including its model and element values, via the Assets HTTP API."
    }

    fn parameters(&self) -> Value {
        path_schema("Fragment path, e.g. /content/dam/mysite/fragments/hero")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        let payload = ctx.client.execute(Self::request(&params)).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListContentFragmentsTool;

impl ListContentFragmentsTool {
    pub fn search(params: &Value) -> ParamResult<SearchParams> {
        let path = match params.optional_str("path")? {
            Some(path) => search_scope("path", path)?,
            None => DEFAULT_DAM_ROOT.to_string(),
        };

        let mut search = SearchParams {
            path: Some(path),
            node_type: Some("dam:Asset".to_string()),
            limit: page_limit(params, DEFAULT_SEARCH_LIMIT)?,
            offset: params.optional_u64("offset", 0)?,
            ..Default::default()
        }
        .predicate("property", "jcr:content/contentFragment")
        .predicate("property.value", "true");

        if let Some(model) = params.optional_str("model")?.filter(|m| !m.is_empty()) {
            search = search
                .predicate("property.1_property", "jcr:content/data/cq:model")
                .predicate("property.1_value", model);
        }
        Ok(search)
    }
}

#[async_trait]
impl Tool for ListContentFragmentsTool {
    fn name(&self) -> &str {
        "aem_list_content_fragments"
    }

    fn description(&self) -> &str {
        "List content fragments under a DAM folder (default /content/dam), optionally only \
         those built from a given model."
    }

    fn parameters(&self) -> Value {
        let (limit, offset) = pagination_schema(DEFAULT_SEARCH_LIMIT);
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Folder to search (default /content/dam)"
                },
                "model": {
                    "type": "string",
                    "description": "Model path, e.g. /conf/mysite/settings/dam/cfm/models/article"
                },
                "limit": limit,
                "offset": offset
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let search = Self::search(&params)?;
        let payload = ctx.client.execute(search.request()).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `aem_create_content_fragment`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateContentFragmentParams {
    pub parent_path: String,
    pub name: String,
    pub title: String,
    pub model: String,
    pub description: Option<String>,
    pub fields: ElementMap,
}

impl CreateContentFragmentParams {
    pub fn fragment_path(&self) -> String {
        format!("{}/{}", self.parent_path, self.name)
    }
}

impl TryFrom<Value> for CreateContentFragmentParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let parent_path = repository_path(
            "parentPath",
            params.required_str("parentPath", "DAM folder for the fragment")?,
        )?;
        let name = params.required_str("name", "node name of the new fragment")?.trim();
        if name.is_empty() || name.contains('/') {
            return Err(ParameterValidationError::invalid_value(
                "name",
                name,
                "must be a single non-empty path segment",
            ));
        }
        let fields = match params.optional_object("fields")? {
            Some(map) => element_map("fields", map)?,
            None => Vec::new(),
        };

        Ok(Self {
            parent_path,
            name: name.to_string(),
            title: params.required_str("title", "fragment title")?.to_string(),
            model: params
                .required_str("model", "content fragment model path")?
                .to_string(),
            description: params.optional_str("description")?.map(str::to_string),
            fields,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateContentFragmentTool;

impl CreateContentFragmentTool {
    pub fn request(params: &CreateContentFragmentParams) -> RequestDescriptor {
        let mut request = RequestDescriptor::post(format!(
            "{}{}",
            ASSETS_API_PREFIX,
            params.fragment_path()
        ))
        .form_field("cq:model", &params.model)
        .form_field("title", &params.title);

        if let Some(description) = &params.description {
            request = request.form_field("description", description);
        }
        for (name, value) in &params.fields {
            for v in value.values() {
                request = request.form_field(format!("elements.{}", name), v);
            }
        }
        request
    }
}

#[async_trait]
impl Tool for CreateContentFragmentTool {
    fn name(&self) -> &str {
        "aem_create_content_fragment"
    }

    fn description(&self) -> &str {
        "Create a content fragment from a model in a DAM folder, with initial element values."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "parentPath": {
                    "type": "string",
                    "minLength": 1,
                    "description": "DAM folder, e.g. /content/dam/mysite/fragments"
                },
                "name": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Node name of the new fragment"
                },
                "title": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Fragment title"
                },
                "model": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Model path, e.g. /conf/mysite/settings/dam/cfm/models/article"
                },
                "description": {
                    "type": "string",
                    "description": "Fragment description"
                },
                "fields": elements_schema("Element name to value (string or list of strings)")
            },
            "required": ["parentPath", "name", "title", "model"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = CreateContentFragmentParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        let path = params.fragment_path();
        tracing::info!(path = %path, model = %params.model, "Content fragment created");
        Ok(ToolResult::json(write_success(&path)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `aem_update_content_fragment`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateContentFragmentParams {
    pub path: String,
    pub title: Option<String>,
    pub fields: ElementMap,
}

impl TryFrom<Value> for UpdateContentFragmentParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let path = repository_path("path", params.required_str("path", "fragment path")?)?;
        let fields = element_map(
            "fields",
            params.required_object("fields", "element name to new value")?,
        )?;
        Ok(Self {
            path,
            title: params.optional_str("title")?.map(str::to_string),
            fields,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateContentFragmentTool;

impl UpdateContentFragmentTool {
    /// The PUT body replaces the fragment's properties wholesale.
    pub fn body(params: &UpdateContentFragmentParams) -> Value {
        let elements: Map<String, Value> = params
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), json!({ "value": value })))
            .collect();

        let mut properties = Map::new();
        if let Some(title) = &params.title {
            properties.insert("title".to_string(), Value::String(title.clone()));
        }
        properties.insert("elements".to_string(), Value::Object(elements));

        json!({ "class": "asset", "properties": properties })
    }

    pub fn request(params: &UpdateContentFragmentParams) -> RequestDescriptor {
        RequestDescriptor::put(format!("{}{}", ASSETS_API_PREFIX, params.path))
            .json(Self::body(params))
    }
}

#[async_trait]
impl Tool for UpdateContentFragmentTool {
    fn name(&self) -> &str {
        "aem_update_content_fragment"
    }

    fn description(&self) -> &str {
        "Replace the element values (and optionally the title) of a content fragment. \
         Elements not supplied are cleared."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Fragment path"
                },
                "title": {
                    "type": "string",
                    "description": "New fragment title"
                },
                "fields": elements_schema("Element name to value (string or list of strings)")
            },
            "required": ["path", "fields"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = UpdateContentFragmentParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.path, "Content fragment updated");
        Ok(ToolResult::json(write_success(&params.path)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DeleteContentFragmentTool;

impl DeleteContentFragmentTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::delete(format!("{}{}", ASSETS_API_PREFIX, params.path))
    }
}

#[async_trait]
impl Tool for DeleteContentFragmentTool {
    fn name(&self) -> &str {
        "aem_delete_content_fragment"
    }

    fn description(&self) -> &str {
        "Delete a content fragment."
    }

    fn parameters(&self) -> Value {
        path_schema("Fragment path")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.path, "Content fragment deleted");
        Ok(ToolResult::json(write_success(&params.path)))
    }
}
