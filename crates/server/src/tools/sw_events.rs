//! Event tools: background sync, page messages, push and status.

use offcache_client::CacheManager;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, json_result};

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag to fire. Defaults to the configured contact form tag.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by a page, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the message was recognised and acted on.
    pub handled: bool,
}

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload text; an empty payload uses the default body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Action button that was clicked; absent for a click on the body.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    /// URL to open in a new window, if any.
    pub open_url: Option<String>,
}

/// Parameters for the sw_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusParams {}

pub async fn sync_impl(manager: &CacheManager, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = match params.tag {
        Some(tag) if tag.trim().is_empty() => {
            return Err(ToolError::InvalidInput("tag cannot be empty".into()).into());
        }
        Some(tag) => tag,
        None => manager.config().sync_tag.clone(),
    };

    let report = manager.sync(&tag).await?;
    json_result(&report)
}

pub async fn message_impl(manager: &CacheManager, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    if !params.message.is_object() {
        return Err(ToolError::InvalidInput("message must be a JSON object".into()).into());
    }
    let handled = manager.message(&params.message).await;
    json_result(&SwMessageOutput { handled })
}

pub async fn push_impl(manager: &CacheManager, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = manager.push(params.payload.as_deref());
    json_result(&notification)
}

pub async fn notification_click_impl(
    manager: &CacheManager, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let open_url = manager.notification_click(params.action.as_deref());
    json_result(&SwNotificationClickOutput { open_url })
}

pub async fn status_impl(manager: &CacheManager, _params: SwStatusParams) -> Result<CallToolResult, McpError> {
    json_result(&manager.status().await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::testing::{StubNetwork, manager, output};
    use offcache_client::{Notification, SyncReport, WorkerState, WorkerStatus};
    use offcache_core::{Request, Response};
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_default_tag_replays() {
        let network = Arc::new(StubNetwork::default());
        let mgr = manager(network.clone()).await;
        mgr.queue_sync(&Request::post("https://example.com/contact", "name=Ada")).await.unwrap();

        network.serve("/contact", Response::new(200));
        let report: SyncReport = output(&sync_impl(&mgr, SwSyncParams { tag: None }).await.unwrap());
        assert_eq!(report.tag, "contact-form-sync");
        assert_eq!(report.replayed, 1);
    }

    #[tokio::test]
    async fn test_sync_unknown_tag_is_noop() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;
        mgr.queue_sync(&Request::post("https://example.com/contact", "name=Ada")).await.unwrap();

        let report: SyncReport =
            output(&sync_impl(&mgr, SwSyncParams { tag: Some("other".into()) }).await.unwrap());
        assert_eq!(report.replayed + report.failed + report.dropped, 0);
        assert_eq!(mgr.db().pending_sync("contact-form-sync").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_blank_tag_rejected() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;
        assert!(sync_impl(&mgr, SwSyncParams { tag: Some("  ".into()) }).await.is_err());
    }

    #[tokio::test]
    async fn test_message_skip_waiting() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;

        let out: SwMessageOutput =
            output(&message_impl(&mgr, SwMessageParams { message: json!({"type": "SKIP_WAITING"}) }).await.unwrap());
        assert!(out.handled);
        assert!(mgr.status().await.skip_waiting);

        let out: SwMessageOutput =
            output(&message_impl(&mgr, SwMessageParams { message: json!({"type": "PING"}) }).await.unwrap());
        assert!(!out.handled);
    }

    #[tokio::test]
    async fn test_message_rejects_non_object() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;
        assert!(message_impl(&mgr, SwMessageParams { message: json!("SKIP_WAITING") }).await.is_err());
    }

    #[tokio::test]
    async fn test_push_default_body() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;

        let note: Notification = output(&push_impl(&mgr, SwPushParams { payload: None }).await.unwrap());
        assert_eq!(note.body, "New update available!");

        let note: Notification =
            output(&push_impl(&mgr, SwPushParams { payload: Some("New project posted".into()) }).await.unwrap());
        assert_eq!(note.body, "New project posted");
        assert_eq!(note.vibrate, vec![100, 50, 100]);
    }

    #[tokio::test]
    async fn test_notification_click() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;

        let params = SwNotificationClickParams { action: Some("explore".into()) };
        let out: SwNotificationClickOutput = output(&notification_click_impl(&mgr, params).await.unwrap());
        assert_eq!(out.open_url.as_deref(), Some("https://example.com/"));

        let params = SwNotificationClickParams { action: Some("close".into()) };
        let out: SwNotificationClickOutput = output(&notification_click_impl(&mgr, params).await.unwrap());
        assert!(out.open_url.is_none());
    }

    #[tokio::test]
    async fn test_status_after_install() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;
        mgr.install().await.unwrap();

        let status: WorkerStatus = output(&status_impl(&mgr, SwStatusParams::default()).await.unwrap());
        assert_eq!(status.state, WorkerState::Installed);
        assert_eq!(status.static_cache, "site-static-v1.0.0");
    }
}
