//! Scripted network and manager builder for worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offcache_core::{AppConfig, CacheDb, Error, Request, Response};

use super::{CacheManager, WorkerConfig};
use crate::fetch::Network;

pub(crate) const ORIGIN: &str = "https://example.com";

/// In-process origin server. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub(crate) struct MockNetwork {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    responses: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve a same-origin path.
    pub(crate) fn serve(&self, path: &str, response: Response) {
        self.serve_url(&format!("{ORIGIN}{path}"), response);
    }

    pub(crate) fn serve_url(&self, url: &str, response: Response) {
        self.inner.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.inner.offline.store(!online, Ordering::SeqCst);
    }

    /// Number of fetches for a same-origin path, any method.
    pub(crate) fn calls_for(&self, path: &str) -> usize {
        let url = format!("{ORIGIN}{path}");
        self.inner.calls.lock().unwrap().iter().filter(|u| **u == url).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.inner.calls.lock().unwrap().push(request.url.clone());
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let found = self.inner.responses.lock().unwrap().get(&request.url).cloned();
        Ok(found.unwrap_or_else(|| Response::new(404).with_body("not found")))
    }
}

pub(crate) fn worker_config(version: &str) -> WorkerConfig {
    let app = AppConfig { origin: ORIGIN.into(), cache_prefix: "site".into(), cache_version: version.into(), ..Default::default() };
    WorkerConfig::from_app(&app).unwrap()
}

pub(crate) async fn manager(network: &MockNetwork) -> CacheManager {
    let db = CacheDb::open_in_memory().await.unwrap();
    CacheManager::new(db, Arc::new(network.clone()), worker_config("v1.0.0"))
}
