//! Responses synthesized when neither the network nor the cache can answer,
//! and the payload shown for push messages.

use offcache_core::Response;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const OFFLINE_MESSAGE: &str = "This content is not available offline";

const OFFLINE_HTML: &str = "<!DOCTYPE html>
<html lang=\"en\">
<head><meta charset=\"utf-8\"><title>Offline</title></head>
<body><h1>You are offline</h1><p>This page will be available again once you reconnect.</p></body>
</html>
";

/// `503` JSON body for API requests.
pub fn offline_json() -> Response {
    let body = serde_json::json!({ "error": "Offline", "message": OFFLINE_MESSAGE });
    Response::new(503)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

/// `503` plain text for assets and everything else.
pub fn offline_text() -> Response {
    Response::new(503)
        .with_header("Content-Type", "text/plain; charset=utf-8")
        .with_body("Offline")
}

/// Built-in offline document, used when the precached one is missing.
pub fn offline_html() -> Response {
    Response::new(200)
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_body(OFFLINE_HTML)
}

/// `202` acknowledgement for a submission queued for background sync.
pub fn queued_json(task_id: i64) -> Response {
    let body = serde_json::json!({
        "queued": true,
        "id": task_id,
        "message": "You are offline. Your submission will be sent when the connection returns.",
    });
    Response::new(202)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Action that opens the site when a notification is clicked.
pub const EXPLORE_ACTION: &str = "explore";

/// A system notification built from a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub timestamp: i64,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn from_push(title: &str, icon: &str, payload: Option<&str>) -> Self {
        let body = payload
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("New update available!");
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: icon.to_string(),
            badge: icon.to_string(),
            vibrate: vec![100, 50, 100],
            timestamp: chrono::Utc::now().timestamp_millis(),
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.into(),
                    title: "Explore".into(),
                    icon: "/static/assets/icons/checkmark.png".into(),
                },
                NotificationAction {
                    action: "close".into(),
                    title: "Close".into(),
                    icon: "/static/assets/icons/xmark.png".into(),
                },
            ],
        }
    }
}
