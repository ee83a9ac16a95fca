//! Caching strategies.
//!
//! Storage failures never fail a request: they are logged and the request
//! carries on as if nothing was cached.

use std::sync::Arc;

use offcache_core::{CacheDb, Request, Response};

use super::offline::{offline_html, offline_json, offline_text, queued_json};
use super::{CacheManager, Route, Served, Source};
use crate::fetch::{Network, resolve};

/// Store a successful GET response in a generation, logging failures.
async fn store(db: &CacheDb, cache_name: &str, request: &Request, response: &Response) {
    if !request.is_get() || !response.is_success() {
        return;
    }
    let cache = match db.open_cache(cache_name).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("failed to open {}: {}", cache_name, e);
            return;
        }
    };
    match cache.put(request, response).await {
        Ok(()) => tracing::debug!("stored {} in {}", request.url, cache.name()),
        Err(e) => tracing::warn!("failed to store {} in {}: {}", request.url, cache.name(), e),
    }
}

async fn revalidate(db: CacheDb, network: Arc<dyn Network>, cache_name: String, request: Request) {
    match network.fetch(&request).await {
        Ok(response) => store(&db, &cache_name, &request, &response).await,
        Err(e) => tracing::debug!("revalidation of {} failed: {}", request.url, e),
    }
}

impl CacheManager {
    /// Current generations, `preferred` first.
    fn generations(&self, preferred: &str) -> Vec<String> {
        let config = &self.config;
        if preferred == config.static_cache {
            vec![config.static_cache.clone(), config.dynamic_cache.clone()]
        } else {
            vec![config.dynamic_cache.clone(), config.static_cache.clone()]
        }
    }

    async fn lookup(&self, preferred: &str, request: &Request) -> Option<Response> {
        match self.db.match_request_in(&self.generations(preferred), request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }

    /// Serve from cache when present, otherwise fetch and store.
    pub(crate) async fn cache_first(&self, request: &Request, route: Route) -> Served {
        let owner = if route == Route::StaticAsset { &self.config.static_cache } else { &self.config.dynamic_cache };

        if let Some(cached) = self.lookup(owner, request).await {
            tracing::debug!("cache hit: {}", request.url);
            return Served::new(cached, Source::Cache, Some(route));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store(&self.db, owner, request, &response).await;
                Served::new(response, Source::Network, Some(route))
            }
            Err(e) => {
                tracing::debug!("cache-first miss while offline for {}: {}", request.url, e);
                Served::new(offline_text(), Source::Offline, Some(route))
            }
        }
    }

    /// Fetch first, falling back to the cache and then to an offline response.
    pub(crate) async fn network_first(&self, request: &Request, route: Route) -> Served {
        let dynamic = &self.config.dynamic_cache;

        match self.network.fetch(request).await {
            Ok(response) => {
                let qualifies = match route {
                    Route::Api => self.config.routes.is_api_cacheable(&request.path()),
                    _ => true,
                };
                if qualifies {
                    store(&self.db, dynamic, request, &response).await;
                }
                Served::new(response, Source::Network, Some(route))
            }
            Err(e) => {
                tracing::debug!("network-first falling back for {}: {}", request.url, e);
                if let Some(cached) = self.lookup(dynamic, request).await {
                    return Served::new(cached, Source::Cache, Some(route));
                }
                self.offline_fallback(route).await
            }
        }
    }

    /// Fetch without touching the cache.
    ///
    /// Also used for non-GET requests outside the bypass rule; a contact form
    /// submission that could not reach the network is queued for background
    /// sync.
    pub(crate) async fn network_only(&self, request: &Request, route: Route) -> Served {
        let err = match self.network.fetch(request).await {
            Ok(response) => return Served::new(response, Source::Network, Some(route)),
            Err(e) => e,
        };

        if err.is_network() && self.config.routes.is_sync_eligible(request) {
            match self.db.enqueue_sync(&self.config.sync_tag, request).await {
                Ok(id) => {
                    tracing::info!(task_id = id, "queued {} {} for background sync", request.method, request.url);
                    return Served::new(queued_json(id), Source::Queued, Some(route));
                }
                Err(e) => tracing::warn!("failed to queue {} for sync: {}", request.url, e),
            }
        }

        tracing::debug!("network-only failed for {}: {}", request.url, err);
        self.offline_fallback(route).await
    }

    /// Serve the cached entry immediately and refresh it in the background.
    pub(crate) async fn stale_while_revalidate(&self, request: &Request) -> Served {
        let route = Some(Route::Uncategorized);
        let dynamic = self.config.dynamic_cache.clone();

        if let Some(cached) = self.lookup(&dynamic, request).await {
            self.spawn_background(revalidate(self.db.clone(), Arc::clone(&self.network), dynamic, request.clone()))
                .await;
            return Served::new(cached, Source::Cache, route);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store(&self.db, &dynamic, request, &response).await;
                Served::new(response, Source::Network, route)
            }
            Err(e) => {
                tracing::debug!("stale-while-revalidate miss while offline for {}: {}", request.url, e);
                Served::new(offline_text(), Source::Offline, route)
            }
        }
    }

    async fn offline_fallback(&self, route: Route) -> Served {
        let response = match route {
            Route::Page => return self.offline_document().await,
            Route::Api => offline_json(),
            _ => offline_text(),
        };
        Served::new(response, Source::Offline, Some(route))
    }

    /// The precached offline page, or the built-in one.
    async fn offline_document(&self) -> Served {
        let page = match resolve(&self.config.origin, &self.config.offline_page) {
            Ok(url) => self.lookup(&self.config.static_cache, &Request::get(url.to_string())).await,
            Err(e) => {
                tracing::warn!("invalid offline page {}: {}", self.config.offline_page, e);
                None
            }
        };
        Served::new(page.unwrap_or_else(offline_html), Source::Offline, Some(Route::Page))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockNetwork, manager};
    use super::*;
    use offcache_core::Destination;

    #[tokio::test]
    async fn test_static_asset_cache_first() {
        let network = MockNetwork::new();
        network.serve("/static/assets/css/style.css", Response::new(200).with_body("body{}"));
        let mgr = manager(&network).await;

        let first = mgr.handle(Request::get("/static/assets/css/style.css")).await.unwrap();
        assert_eq!(first.source, Source::Network);
        assert_eq!(first.response.status, 200);

        let static_cache = mgr.db().open_cache(&mgr.config().static_cache).await.unwrap();
        assert_eq!(static_cache.count().await.unwrap(), 1);

        let second = mgr.handle(Request::get("/static/assets/css/style.css")).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.body, b"body{}".to_vec());
        assert_eq!(network.calls_for("/static/assets/css/style.css"), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let network = MockNetwork::new();
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::get("/static/missing.js")).await.unwrap();
        assert_eq!(served.response.status, 404);

        mgr.handle(Request::get("/static/missing.js")).await.unwrap();
        assert_eq!(network.calls_for("/static/missing.js"), 2);
    }

    #[tokio::test]
    async fn test_cache_first_offline_without_entry() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::get("/static/app.js")).await.unwrap();
        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_image_stored_in_dynamic_generation() {
        let network = MockNetwork::new();
        network.serve("/uploads/project.webp", Response::new(200).with_body("img"));
        let mgr = manager(&network).await;

        let req = Request::get("/uploads/project.webp").with_destination(Destination::Image);
        mgr.handle(req.clone()).await.unwrap();

        let dynamic = mgr.db().open_cache(&mgr.config().dynamic_cache).await.unwrap();
        assert_eq!(dynamic.count().await.unwrap(), 1);

        network.set_online(false);
        let served = mgr.handle(req).await.unwrap();
        assert_eq!(served.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_document_network_first_updates_cache() {
        let network = MockNetwork::new();
        network.serve("/about", Response::new(200).with_body("v1"));
        let mgr = manager(&network).await;
        let req = Request::get("/about").with_destination(Destination::Document);

        mgr.handle(req.clone()).await.unwrap();
        network.serve("/about", Response::new(200).with_body("v2"));
        let fresh = mgr.handle(req.clone()).await.unwrap();
        assert_eq!(fresh.source, Source::Network);
        assert_eq!(fresh.response.text(), "v2");

        network.set_online(false);
        let offline = mgr.handle(req).await.unwrap();
        assert_eq!(offline.source, Source::Cache);
        assert_eq!(offline.response.text(), "v2");
    }

    #[tokio::test]
    async fn test_document_offline_uses_precached_page() {
        let network = MockNetwork::new();
        network.serve("/offline.html", Response::new(200).with_body("<h1>precached offline</h1>"));
        let mgr = manager(&network).await;
        mgr.install().await.unwrap();
        mgr.activate().await.unwrap();

        network.set_online(false);
        let req = Request::get("/").with_destination(Destination::Document);
        let served = mgr.handle(req).await.unwrap();
        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, 200);
        assert_eq!(served.response.text(), "<h1>precached offline</h1>");
    }

    #[tokio::test]
    async fn test_document_offline_without_anything_cached() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;

        let req = Request::get("/").with_destination(Destination::Document);
        let served = mgr.handle(req).await.unwrap();
        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, 200);
        assert!(served.response.content_type().unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_api_offline_json() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::get("/api/projects")).await.unwrap();
        assert_eq!(served.response.status, 503);
        assert!(served.response.text().contains("\"error\":\"Offline\""));
    }

    #[tokio::test]
    async fn test_api_allow_list_controls_storage() {
        let network = MockNetwork::new();
        network.serve("/api/projects", Response::new(200).with_body("[1,2]"));
        network.serve("/api/donations", Response::new(200).with_body("[3]"));
        let mgr = manager(&network).await;

        mgr.handle(Request::get("/api/projects")).await.unwrap();
        mgr.handle(Request::get("/api/donations")).await.unwrap();

        network.set_online(false);
        let projects = mgr.handle(Request::get("/api/projects")).await.unwrap();
        assert_eq!(projects.source, Source::Cache);
        assert_eq!(projects.response.text(), "[1,2]");

        let donations = mgr.handle(Request::get("/api/donations")).await.unwrap();
        assert_eq!(donations.source, Source::Offline);
        assert_eq!(donations.response.status, 503);
    }

    #[tokio::test]
    async fn test_admin_get_never_cached() {
        let network = MockNetwork::new();
        network.serve("/admin/stats", Response::new(200).with_body("{}"));
        let mgr = manager(&network).await;

        mgr.handle(Request::get("/admin/stats")).await.unwrap();
        mgr.handle(Request::get("/admin/stats")).await.unwrap();
        assert_eq!(network.calls_for("/admin/stats"), 2);
        assert!(mgr.db().cache_names().await.unwrap().is_empty());

        network.set_online(false);
        let served = mgr.handle(Request::get("/admin/stats")).await.unwrap();
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_bypass_propagates_result() {
        let network = MockNetwork::new();
        network.serve("/api/contact", Response::new(201).with_body("created"));
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::post("/api/contact", "a=1")).await.unwrap();
        assert_eq!(served.route, Some(Route::Bypass));
        assert_eq!(served.response.status, 201);
        assert!(mgr.db().cache_names().await.unwrap().is_empty());

        network.set_online(false);
        let result = mgr.handle(Request::post("/admin/projects", "a=1")).await;
        assert!(result.is_err());
        assert!(mgr.db().pending_sync(&mgr.config().sync_tag).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_origin_pass_through() {
        let network = MockNetwork::new();
        network.serve_url("https://cdn.example.net/lib.js", Response::new(200).with_body("lib"));
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::get("https://cdn.example.net/lib.js")).await.unwrap();
        assert_eq!(served.route, None);
        assert_eq!(served.response.text(), "lib");
        assert!(mgr.db().cache_names().await.unwrap().is_empty());

        network.set_online(false);
        assert!(mgr.handle(Request::get("https://cdn.example.net/lib.js")).await.is_err());
    }

    #[tokio::test]
    async fn test_stale_while_revalidate() {
        let network = MockNetwork::new();
        network.serve("/wiki/rust", Response::new(200).with_body("old"));
        let mgr = manager(&network).await;

        let first = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert_eq!(first.source, Source::Network);
        assert_eq!(first.response.text(), "old");

        network.serve("/wiki/rust", Response::new(200).with_body("new"));
        let stale = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert_eq!(stale.source, Source::Cache);
        assert_eq!(stale.response.text(), "old");

        mgr.wait_until_idle().await;
        let refreshed = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert_eq!(refreshed.response.text(), "new");
        mgr.wait_until_idle().await;
        assert_eq!(network.calls_for("/wiki/rust"), 3);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_offline_miss() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_failed_contact_submission_is_queued() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;

        let req = Request::post("/contact", "name=Ada").with_destination(Destination::Document);
        let served = mgr.handle(req).await.unwrap();
        assert_eq!(served.source, Source::Queued);
        assert_eq!(served.response.status, 202);

        let pending = mgr.db().pending_sync(&mgr.config().sync_tag).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://example.com/contact");
        assert_eq!(pending[0].body.as_deref(), Some(b"name=Ada".as_slice()));
    }

    #[tokio::test]
    async fn test_post_never_cached() {
        let network = MockNetwork::new();
        network.serve("/contact", Response::new(200).with_body("thanks"));
        let mgr = manager(&network).await;

        let served = mgr.handle(Request::post("/contact", "name=Ada")).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert!(mgr.db().cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_hits_do_not_accumulate_tasks() {
        let network = MockNetwork::new();
        network.serve("/wiki/rust", Response::new(200).with_body("page"));
        let mgr = manager(&network).await;
        mgr.handle(Request::get("/wiki/rust")).await.unwrap();

        for _ in 0..200 {
            let served = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
            assert_eq!(served.source, Source::Cache);
        }
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert!(mgr.background.lock().await.len() <= 1);
        mgr.wait_until_idle().await;
        assert!(mgr.background.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_still_serves_network() {
        let network = MockNetwork::new();
        network.serve("/static/assets/css/style.css", Response::new(200).with_body("body{}"));
        network.serve("/about", Response::new(200).with_body("about"));
        network.serve("/wiki/rust", Response::new(200).with_body("rust"));
        let mgr = manager(&network).await;
        mgr.db().close().await.unwrap();

        let asset = mgr.handle(Request::get("/static/assets/css/style.css")).await.unwrap();
        assert_eq!(asset.source, Source::Network);
        assert_eq!(asset.response.text(), "body{}");

        let page = mgr
            .handle(Request::get("/about").with_destination(Destination::Document))
            .await
            .unwrap();
        assert_eq!(page.source, Source::Network);
        assert_eq!(page.response.text(), "about");

        let other = mgr.handle(Request::get("/wiki/rust")).await.unwrap();
        assert_eq!(other.source, Source::Network);
        assert_eq!(other.response.text(), "rust");
    }

    #[tokio::test]
    async fn test_storage_failure_offline_falls_back() {
        let network = MockNetwork::new();
        network.set_online(false);
        let mgr = manager(&network).await;
        mgr.db().close().await.unwrap();

        let page = mgr.handle(Request::get("/").with_destination(Destination::Document)).await.unwrap();
        assert_eq!(page.source, Source::Offline);
        assert_eq!(page.response.status, 200);

        let api = mgr.handle(Request::get("/api/projects")).await.unwrap();
        assert_eq!(api.source, Source::Offline);
        assert!(api.response.text().contains("\"error\":\"Offline\""));

        let asset = mgr.handle(Request::get("/static/app.js")).await.unwrap();
        assert_eq!(asset.response.status, 503);

        let contact = mgr.handle(Request::post("/contact", "name=Ada")).await.unwrap();
        assert_eq!(contact.source, Source::Offline);
        assert_eq!(contact.response.status, 503);
    }
}
