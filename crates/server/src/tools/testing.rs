//! Test doubles shared by the tool tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offcache_client::{CacheManager, Network, WorkerConfig};
use offcache_core::{AppConfig, CacheDb, Error, Request, Response};
use rmcp::model::CallToolResult;

pub const ORIGIN: &str = "https://example.com";

#[derive(Default)]
pub struct StubNetwork {
    responses: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn serve(&self, path: &str, response: Response) {
        self.responses.lock().unwrap().insert(format!("{ORIGIN}{path}"), response);
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let found = self.responses.lock().unwrap().get(&request.url).cloned();
        Ok(found.unwrap_or_else(|| Response::new(404)))
    }
}

pub async fn manager(network: Arc<StubNetwork>) -> CacheManager {
    let app = AppConfig { origin: ORIGIN.into(), cache_prefix: "site".into(), ..Default::default() };
    let db = CacheDb::open_in_memory().await.unwrap();
    CacheManager::new(db, network, WorkerConfig::from_app(&app).unwrap())
}

/// Parse the JSON text content of a tool result.
pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
