//! cache_get tool implementation.
//!
//! Looks a URL up in storage without touching the network.

use offcache_client::CacheManager;
use offcache_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or origin-relative path.
    pub url: String,

    /// Restrict the lookup to one generation. Searches all when absent.
    #[serde(default)]
    pub cache: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(manager: &CacheManager, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = manager.resolve(&params.url)?;
    let request = Request::get(url.clone());

    let found = match &params.cache {
        Some(name) => {
            if !manager.db().has_cache(name).await? {
                return Err(Error::CacheMiss(format!("no cache named {name}")).into());
            }
            manager.db().open_cache(name).await?.match_request(&request).await?
        }
        None => manager.db().match_request(&request).await?,
    };
    let response = found.ok_or_else(|| Error::CacheMiss(url.clone()))?;

    let output = CacheGetOutput {
        url,
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        body: response.text(),
    };
    json_result(&output)
}
