//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache manager.
use std::sync::Arc;

use offcache_client::CacheManager;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{
    CacheDeleteParams, CacheGetParams, CacheKeysParams, delete_impl, get_impl, keys_impl,
};
use crate::tools::sw_events::{message_impl, notification_click_impl, push_impl, status_impl, sync_impl};
use crate::tools::sw_fetch::fetch_impl;
use crate::tools::{
    SwFetchParams, SwMessageParams, SwNotificationClickParams, SwPushParams, SwStatusParams, SwSyncParams,
};

/// The main MCP server handler for offcache.
#[derive(Clone)]
pub struct OffcacheServer {
    manager: Arc<CacheManager>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffcacheServer {
    /// Create a new server handler around an installed cache manager.
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Handle a request the way an intercepted page fetch would be: classify it, apply the caching strategy and return the response with its source (network, cache, offline, queued)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(description = "Fire a background sync event. Replays queued contact form submissions and reports how many succeeded.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.manager, params.0).await
    }

    #[tool(description = "Post a control message from a page, e.g. {\"type\": \"SKIP_WAITING\"}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.manager, params.0).await
    }

    #[tool(description = "Deliver a push message and return the notification that would be shown.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.manager, params.0).await
    }

    #[tool(description = "Handle a click on a shown notification. Returns the URL to open for the explore action.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.manager, params.0).await
    }

    #[tool(description = "Report the worker lifecycle state and current cache generation names.")]
    async fn sw_status(&self, params: Parameters<SwStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.manager, params.0).await
    }

    #[tool(description = "List cache generations, or the stored requests of one generation.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.manager, params.0).await
    }

    #[tool(description = "Look a URL up in cache storage without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.manager, params.0).await
    }

    #[tool(description = "Delete a cache generation, or a single URL from one generation.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.manager, params.0).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
