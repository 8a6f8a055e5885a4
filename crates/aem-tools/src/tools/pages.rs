//! Page tools.
//!
//! Reads use the Sling JSON renderer (`.infinity.json` for the full subtree,
//! `.1.json` for one level of children). Writes go through the WCM command
//! servlet, except property updates which post straight to the page's
//! `jcr:content` node.

use aem_client::RequestDescriptor;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CHARSET_FIELD, PathParams, path_schema, write_success};
use crate::args::{PropertyMap, flatten_properties};
use crate::error::Result;
use crate::tool::{
    ParamExt, ParameterValidationError, Tool, ToolContext, ToolResult, repository_path,
};

/// WCM command servlet.
const WCM_COMMAND_PATH: &str = "/bin/wcmcommand";

/// Derive a page name from a title: lower-case ASCII alphanumerics, with any
/// run of other characters collapsed to a single `-`.
pub fn derive_page_label(title: &str) -> String {
    let mut label = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            label.push(c.to_ascii_lowercase());
        } else if !label.is_empty() && !label.ends_with('-') {
            label.push('-');
        }
    }
    while label.ends_with('-') {
        label.pop();
    }
    label
}

// ─────────────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────────────

/// Full page content including all descendants.
#[derive(Debug, Clone, Default)]
pub struct GetPageTool;

impl GetPageTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}.infinity.json", params.path))
    }
}

#[async_trait]
impl Tool for GetPageTool {
    fn name(&self) -> &str {
        "aem_get_page"
    }

    fn description(&self) -> &str {
        "Get the full content of an AEM page, including all child nodes."
    }

    fn parameters(&self) -> Value {
        path_schema("Page path, e.g. /content/mysite/en/home")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        let payload = ctx.client.execute(Self::request(&params)).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

/// Immediate children of a page.
#[derive(Debug, Clone, Default)]
pub struct ListPagesTool;

impl ListPagesTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}.1.json", params.path))
    }
}

#[async_trait]
impl Tool for ListPagesTool {
    fn name(&self) -> &str {
        "aem_list_pages"
    }

    fn description(&self) -> &str {
        "List the direct children of an AEM page or folder (one level deep)."
    }

    fn parameters(&self) -> Value {
        path_schema("Parent path, e.g. /content/mysite/en")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        let payload = ctx.client.execute(Self::request(&params)).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `aem_create_page`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePageParams {
    pub parent_path: String,
    pub title: String,
    pub template: String,
    /// Node name; derived from the title when not supplied.
    pub label: String,
}

impl CreatePageParams {
    /// Path of the page once created.
    pub fn page_path(&self) -> String {
        format!("{}/{}", self.parent_path, self.label)
    }
}

impl TryFrom<Value> for CreatePageParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let parent_path = repository_path(
            "parentPath",
            params.required_str("parentPath", "path of the parent page")?,
        )?;
        let title = params.required_str("title", "page title")?;
        let template = params.required_str(
            "template",
            "template path, e.g. /conf/site/settings/wcm/templates/page",
        )?;

        let label = match params.optional_str("label")? {
            Some(label) if !label.trim().is_empty() => label.trim().to_string(),
            _ => derive_page_label(title),
        };
        if label.is_empty() {
            return Err(ParameterValidationError::invalid_value(
                "title",
                title,
                "cannot derive a page name; supply 'label'",
            ));
        }

        Ok(Self {
            parent_path,
            title: title.to_string(),
            template: template.to_string(),
            label,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreatePageTool;

impl CreatePageTool {
    pub fn request(params: &CreatePageParams) -> RequestDescriptor {
        RequestDescriptor::post(WCM_COMMAND_PATH)
            .form_field("cmd", "createPage")
            .form_field(CHARSET_FIELD.0, CHARSET_FIELD.1)
            .form_field("parentPath", &params.parent_path)
            .form_field("title", &params.title)
            .form_field("label", &params.label)
            .form_field("template", &params.template)
    }
}

#[async_trait]
impl Tool for CreatePageTool {
    fn name(&self) -> &str {
        "aem_create_page"
    }

    fn description(&self) -> &str {
        "Create a new AEM page under a parent page from a template. The page name defaults to \
         a slug of the title."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "parentPath": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Path of the parent page, e.g. /content/mysite/en"
                },
                "title": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Page title"
                },
                "template": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Template path, e.g. /conf/mysite/settings/wcm/templates/content-page"
                },
                "label": {
                    "type": "string",
                    "description": "Page node name (derived from the title if omitted)"
                }
            },
            "required": ["parentPath", "title", "template"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = CreatePageParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.page_path(), "Page created");
        Ok(ToolResult::json(write_success(&params.page_path())))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `aem_update_page_properties`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePagePropertiesParams {
    pub path: String,
    pub properties: PropertyMap,
}

impl TryFrom<Value> for UpdatePagePropertiesParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        let path = repository_path("path", params.required_str("path", "page path")?)?;
        let properties = params
            .required_object("properties", "map of property name to value")?
            .clone();
        Ok(Self { path, properties })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePagePropertiesTool;

impl UpdatePagePropertiesTool {
    pub fn request(params: &UpdatePagePropertiesParams) -> RequestDescriptor {
        flatten_properties(&params.properties).into_iter().fold(
            RequestDescriptor::post(format!("{}/jcr:content", params.path))
                .form_field(CHARSET_FIELD.0, CHARSET_FIELD.1),
            |request, (key, value)| request.form_field(key, value),
        )
    }
}

#[async_trait]
impl Tool for UpdatePagePropertiesTool {
    fn name(&self) -> &str {
        "aem_update_page_properties"
    }

    fn description(&self) -> &str {
        "Set properties on a page's jcr:content node, e.g. {\"jcr:title\": \"New Title\"}. \
         Array values become multi-valued properties; null values are skipped."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Page path, e.g. /content/mysite/en/home"
                },
                "properties": {
                    "type": "object",
                    "description": "Property name to value"
                }
            },
            "required": ["path", "properties"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = UpdatePagePropertiesParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.path, count = params.properties.len(), "Page properties updated");
        Ok(ToolResult::json(write_success(&params.path)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `aem_delete_page`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePageParams {
    pub path: String,
    /// Delete even if the page is referenced elsewhere.
    pub force: bool,
}

impl TryFrom<Value> for DeletePageParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            path: repository_path("path", params.required_str("path", "page path")?)?,
            force: params.optional_bool("force", false)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeletePageTool;

impl DeletePageTool {
    pub fn request(params: &DeletePageParams) -> RequestDescriptor {
        RequestDescriptor::post(WCM_COMMAND_PATH)
            .form_field("cmd", "deletePage")
            .form_field(CHARSET_FIELD.0, CHARSET_FIELD.1)
            .form_field("path", &params.path)
            .form_field("force", params.force.to_string())
    }
}

#[async_trait]
impl Tool for DeletePageTool {
    fn name(&self) -> &str {
        "aem_delete_page"
    }

    fn description(&self) -> &str {
        "Delete an AEM page. Set force to delete even when other content references it."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Page path"
                },
                "force": {
                    "type": "boolean",
                    "description": "Delete even if referenced (default false)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = DeletePageParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.path, force = params.force, "Page deleted");
        Ok(ToolResult::json(write_success(&params.path)))
    }
}
