//! The offline cache manager.
//!
//! One [`CacheManager`] is built per worker version. It owns the current
//! static/dynamic generation names, classifies every intercepted request and
//! dispatches it to a caching strategy:
//!
//! | Route | Strategy | Stored in |
//! |-------|----------|-----------|
//! | page | network-first | dynamic |
//! | image | cache-first | dynamic |
//! | api | network-first | dynamic (allow-listed paths only) |
//! | admin | network-only | never |
//! | static asset | cache-first | static |
//! | uncategorized | stale-while-revalidate | dynamic |
//!
//! Strategies always resolve to a response. Only cross-origin and bypass
//! requests surface network errors to the caller.

pub mod lifecycle;
pub mod offline;
pub mod route;
mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use offcache_core::{AppConfig, CacheDb, Error, InstallMode, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, is_same_origin, resolve};

pub use lifecycle::{ActivationReport, InstallReport, WorkerState, WorkerStatus};
pub use offline::Notification;
pub use route::{Route, RouteRules};
pub use sync::SyncReport;

/// Immutable settings of one worker version.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub precache: Vec<String>,
    pub offline_page: String,
    pub install_mode: InstallMode,
    pub sync_tag: String,
    pub sync_max_attempts: Option<u32>,
    pub routes: RouteRules,
    pub app_name: String,
    pub notification_icon: String,
}

impl WorkerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let routes = RouteRules { api_cache_endpoints: config.api_cache_endpoints.clone(), ..Default::default() };

        Ok(Self {
            origin,
            static_cache: config.static_cache_name(),
            dynamic_cache: config.dynamic_cache_name(),
            precache: config.precache.clone(),
            offline_page: config.offline_page.clone(),
            install_mode: config.install_mode,
            sync_tag: config.sync_tag.clone(),
            sync_max_attempts: config.sync_max_attempts,
            routes,
            app_name: config.app_name.clone(),
            notification_icon: config.notification_icon.clone(),
        })
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Network,
    Cache,
    /// Synthesized fallback (or the precached offline page).
    Offline,
    /// Submission stored for background sync.
    Queued,
}

/// Outcome of an intercepted fetch.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    /// `None` for cross-origin pass-through.
    pub route: Option<Route>,
}

impl Served {
    pub(crate) fn new(response: Response, source: Source, route: Option<Route>) -> Self {
        Self { response, source, route }
    }
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    pub(crate) state: WorkerState,
    pub(crate) skip_waiting: bool,
    pub(crate) clients_claimed: bool,
}

/// Request interception and cache lifecycle for one worker version.
pub struct CacheManager {
    db: CacheDb,
    network: Arc<dyn Network>,
    config: Arc<WorkerConfig>,
    lifecycle: Mutex<Lifecycle>,
    background: Mutex<JoinSet<()>>,
}

impl CacheManager {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: WorkerConfig) -> Self {
        Self {
            db,
            network,
            config: Arc::new(config),
            lifecycle: Mutex::new(Lifecycle {
                state: WorkerState::Parsed,
                skip_waiting: false,
                clients_claimed: false,
            }),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Handle one intercepted request.
    ///
    /// Relative targets (`/api/projects`) are resolved against the origin.
    /// Errors are only returned for unparseable URLs and for network
    /// failures on cross-origin or bypass requests.
    pub async fn handle(&self, request: Request) -> Result<Served, Error> {
        let url = self.resolve_url(&request.url)?;
        let request = Request { url: url.to_string(), ..request };

        if !is_same_origin(&url, &self.config.origin) {
            tracing::debug!("cross-origin pass-through: {} {}", request.method, request.url);
            let response = self.network.fetch(&request).await?;
            return Ok(Served::new(response, Source::Network, None));
        }

        let route = self.config.routes.classify(&request);
        tracing::debug!(route = ?route, "{} {}", request.method, request.url);

        let served = match route {
            Route::Bypass => {
                let response = self.network.fetch(&request).await?;
                Served::new(response, Source::Network, Some(route))
            }
            _ if !request.is_get() => self.network_only(&request, route).await,
            Route::Page | Route::Api => self.network_first(&request, route).await,
            Route::Image | Route::StaticAsset => self.cache_first(&request, route).await,
            Route::Admin => self.network_only(&request, route).await,
            Route::Uncategorized => self.stale_while_revalidate(&request).await,
        };

        Ok(served)
    }

    /// Resolve an absolute URL or origin-relative path against the origin.
    pub fn resolve(&self, input: &str) -> Result<String, Error> {
        self.resolve_url(input).map(String::from)
    }

    fn resolve_url(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.config.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Wait for every background revalidation started so far.
    pub async fn wait_until_idle(&self) {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("background revalidation panicked: {}", e);
            }
        }
    }

    /// Track a background revalidation, reaping the ones already finished.
    pub(crate) async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.background.lock().await;
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("background revalidation panicked: {}", e);
            }
        }
        tasks.spawn(task);
    }

    /// Build the notification for a push message.
    pub fn push(&self, payload: Option<&str>) -> Notification {
        Notification::from_push(&self.config.app_name, &self.config.notification_icon, payload)
    }

    /// Handle a click on a notification, returning the URL to open.
    ///
    /// Only the explore action opens a window; any other click just closes
    /// the notification.
    pub fn notification_click(&self, action: Option<&str>) -> Option<String> {
        if action == Some(offline::EXPLORE_ACTION) {
            tracing::debug!("notification explore clicked");
            Some(self.config.origin.to_string())
        } else {
            None
        }
    }
}
