//! Install, activate and control messages.

use offcache_core::{Error, InstallMode, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::CacheManager;

/// Worker lifecycle states, in the order a healthy worker passes through
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never serve requests.
    Redundant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    /// Precache paths now stored in the static generation.
    pub cached: Vec<String>,
    /// Precache paths skipped, with the reason.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    /// Generations purged because they belong to an older version.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
    pub static_cache: String,
    pub dynamic_cache: String,
}

impl CacheManager {
    /// Precache the static manifest.
    ///
    /// In best-effort mode unreachable assets are logged and skipped. In
    /// atomic mode any failure marks the worker redundant and returns
    /// `InstallFailed`; a static generation created by this install is
    /// discarded, one that already existed is kept. A successful install calls skip-waiting.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.state != WorkerState::Parsed {
                return Err(Error::InvalidState(format!("cannot install from {:?}", lifecycle.state)));
            }
            lifecycle.state = WorkerState::Installing;
        }
        tracing::info!(cache = %self.config.static_cache, "installing");

        match self.precache().await {
            Ok(report) => {
                self.skip_waiting().await;
                self.lifecycle.lock().await.state = WorkerState::Installed;
                tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "installed");
                Ok(report)
            }
            Err(e) => {
                self.lifecycle.lock().await.state = WorkerState::Redundant;
                tracing::warn!("install failed: {}", e);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let atomic = self.config.install_mode == InstallMode::Atomic;
        // A generation left by an earlier run of this version is live; a failed
        // install must not discard it.
        let created = !self.db.has_cache(&self.config.static_cache).await?;
        let cache = self.db.open_cache(&self.config.static_cache).await?;

        let mut fetched: Vec<(String, Request, Response)> = Vec::new();
        let mut report = InstallReport::default();

        for path in &self.config.precache {
            let url = match self.config.origin.join(path) {
                Ok(url) => url,
                Err(e) => {
                    report.failed.push((path.clone(), e.to_string()));
                    continue;
                }
            };
            let request = Request::get(url.to_string());
            match self.network.fetch(&request).await {
                Ok(response) if response.is_success() => fetched.push((path.clone(), request, response)),
                Ok(response) => report.failed.push((path.clone(), format!("status {}", response.status))),
                Err(e) => report.failed.push((path.clone(), e.to_string())),
            }
        }

        if atomic && !report.failed.is_empty() {
            let paths: Vec<&str> = report.failed.iter().map(|(p, _)| p.as_str()).collect();
            if created {
                self.discard_static().await;
            }
            return Err(Error::InstallFailed(format!("could not precache {}", paths.join(", "))));
        }

        for (path, request, response) in fetched {
            match cache.put(&request, &response).await {
                Ok(()) => report.cached.push(path),
                Err(e) if atomic => {
                    if created {
                        self.discard_static().await;
                    }
                    return Err(Error::InstallFailed(format!("could not store {path}: {e}")));
                }
                Err(e) => report.failed.push((path, e.to_string())),
            }
        }

        for (path, reason) in &report.failed {
            tracing::warn!("precache skipped {}: {}", path, reason);
        }

        Ok(report)
    }

    async fn discard_static(&self) {
        if let Err(e) = self.db.delete_cache(&self.config.static_cache).await {
            tracing::warn!("failed to discard {}: {}", self.config.static_cache, e);
        }
    }

    /// Purge generations of older versions, then claim clients.
    ///
    /// Requires an installed worker that has been told to skip waiting.
    /// Activating an already active worker is a no-op.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            let state = lifecycle.state;
            match state {
                WorkerState::Activated => return Ok(ActivationReport::default()),
                WorkerState::Installed if lifecycle.skip_waiting => lifecycle.state = WorkerState::Activating,
                WorkerState::Installed => {
                    return Err(Error::InvalidState("installed worker is waiting; send SKIP_WAITING".into()));
                }
                state => return Err(Error::InvalidState(format!("cannot activate from {state:?}"))),
            }
        }
        tracing::info!("activating");

        let mut report = ActivationReport::default();
        if let Err(e) = self.purge_old_generations(&mut report).await {
            self.lifecycle.lock().await.state = WorkerState::Installed;
            return Err(e);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.clients_claimed = true;
        lifecycle.state = WorkerState::Activated;
        tracing::info!(deleted = report.deleted.len(), "activated and claimed clients");

        Ok(report)
    }

    async fn purge_old_generations(&self, report: &mut ActivationReport) -> Result<(), Error> {
        for name in self.db.cache_names().await? {
            if name == self.config.static_cache || name == self.config.dynamic_cache {
                continue;
            }
            tracing::info!(cache = %name, "clearing old cache");
            self.db.delete_cache(&name).await?;
            report.deleted.push(name);
        }
        Ok(())
    }

    /// Allow this worker to activate without waiting for old clients.
    pub async fn skip_waiting(&self) {
        self.lifecycle.lock().await.skip_waiting = true;
    }

    /// Handle an out-of-band control message from a page.
    ///
    /// Accepts `{"type": "SKIP_WAITING"}` and `{"action": "skipWaiting"}`.
    /// Returns whether the message was recognised.
    pub async fn message(&self, message: &serde_json::Value) -> bool {
        let is_skip = message.get("type").and_then(|v| v.as_str()) == Some("SKIP_WAITING")
            || message.get("action").and_then(|v| v.as_str()) == Some("skipWaiting");

        if is_skip {
            tracing::info!("skip waiting requested");
            self.skip_waiting().await;
        } else {
            tracing::debug!("ignoring message: {}", message);
        }
        is_skip
    }

    pub async fn status(&self) -> WorkerStatus {
        let lifecycle = self.lifecycle.lock().await;
        WorkerStatus {
            state: lifecycle.state,
            skip_waiting: lifecycle.skip_waiting,
            clients_claimed: lifecycle.clients_claimed,
            static_cache: self.config.static_cache.clone(),
            dynamic_cache: self.config.dynamic_cache.clone(),
        }
    }
}
