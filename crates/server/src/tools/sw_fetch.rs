//! sw_fetch tool implementation.
//!
//! Runs a request through the cache manager exactly as an intercepted page
//! fetch would be handled.

use offcache_client::{CacheManager, Route, Source};
use offcache_core::{Destination, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, json_result};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL or origin-relative path (e.g. "/api/projects").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, image, style, script, font, manifest
    /// or empty (default).
    #[serde(default)]
    pub destination: Destination,

    /// Request headers.
    #[serde(default)]
    pub headers: Vec<HeaderParam>,

    /// Request body as UTF-8 text.
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderParam {
    pub name: String,
    pub value: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub status: u16,
    pub headers: Vec<HeaderParam>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Where the response came from.
    pub source: Source,
    /// Strategy the request was routed to; absent for cross-origin requests.
    pub route: Option<Route>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(manager: &CacheManager, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.is_empty() || !params.method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {}", params.method)).into());
    }

    let mut request = Request::new(&params.method, params.url).with_destination(params.destination);
    for header in params.headers {
        request = request.with_header(header.name, header.value);
    }
    request.body = params.body.map(String::into_bytes);

    let served = manager.handle(request).await?;

    let output = SwFetchOutput {
        status: served.response.status,
        headers: served
            .response
            .headers
            .iter()
            .map(|(name, value)| HeaderParam { name: name.clone(), value: value.clone() })
            .collect(),
        body: served.response.text(),
        source: served.source,
        route: served.route,
    };

    json_result(&output)
}
