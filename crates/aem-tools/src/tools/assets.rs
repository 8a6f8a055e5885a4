//! DAM asset tools.

use aem_client::RequestDescriptor;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::search::{SearchParams, page_limit, pagination_schema};
use super::{PathParams, path_schema};
use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolResult, search_scope};

/// Root of the asset repository.
pub const DEFAULT_DAM_ROOT: &str = "/content/dam";

/// Page size for asset listings.
pub const DEFAULT_ASSET_LIMIT: i64 = 50;

const ASSET_NODE_TYPE: &str = "dam:Asset";

/// Properties of an asset node.
#[derive(Debug, Clone, Default)]
pub struct GetAssetMetadataTool;

impl GetAssetMetadataTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}.json", params.path))
    }
}

#[async_trait]
impl Tool for GetAssetMetadataTool {
    fn name(&self) -> &str {
        "aem_get_asset_metadata"
    }

    fn description(&self) -> &str {
        "Get the metadata of a DAM asset, read as the properties of the asset node."
    }

    fn parameters(&self) -> Value {
        path_schema("Asset path, e.g. /content/dam/mysite/hero.jpg")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        let payload = ctx.client.execute(Self::request(&params)).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

/// Renditions folder of an asset, one level deep.
#[derive(Debug, Clone, Default)]
pub struct GetAssetRenditionsTool;

impl GetAssetRenditionsTool {
    pub fn request(params: &PathParams) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}/jcr:content/renditions.1.json", params.path))
    }
}

#[async_trait]
impl Tool for GetAssetRenditionsTool {
    fn name(&self) -> &str {
        "aem_get_asset_renditions"
    }

    fn description(&self) -> &str {
        "List the renditions (original, thumbnails, web renditions) of a DAM asset."
    }

    fn parameters(&self) -> Value {
        path_schema("Asset path, e.g. /content/dam/mysite/hero.jpg")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = PathParams::try_from(params)?;
        let payload = ctx.client.execute(Self::request(&params)).await?;
        Ok(ToolResult::from_payload(payload))
    }
}

/// Assets under a folder, via QueryBuilder.
#[derive(Debug, Clone, Default)]
pub struct ListAssetsTool;

impl ListAssetsTool {
    pub fn search(params: &Value) -> crate::tool::ParamResult<SearchParams> {
        let path = match params.optional_str("path")? {
            Some(path) => search_scope("path", path)?,
            None => DEFAULT_DAM_ROOT.to_string(),
        };
        Ok(SearchParams {
            path: Some(path),
            node_type: Some(ASSET_NODE_TYPE.to_string()),
            limit: page_limit(params, DEFAULT_ASSET_LIMIT)?,
            offset: params.optional_u64("offset", 0)?,
            ..Default::default()
        })
    }
}

#[async_trait]
impl Tool for ListAssetsTool {
    fn name(&self) -> &str {
        "aem_list_assets"
    }

    fn description(&self) -> &str {
        "List DAM assets under a folder (default /content/dam)."
    }

    fn parameters(&self) -> Value {
        let (limit, offset) = pagination_schema(DEFAULT_ASSET_LIMIT);
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Folder to list (default /content/dam)"
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
