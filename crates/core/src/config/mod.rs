//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How install treats a precache asset that cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    /// Skip the failing asset and keep the ones that succeeded.
    #[default]
    BestEffort,
    /// Any failure aborts the install and nothing is stored.
    Atomic,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered for. Requests to any other origin
    /// pass through untouched.
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version baked into the generation names.
    ///
    /// Bumping it makes the next activation purge every older generation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths fetched into the static generation at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// API paths whose responses may be kept in the dynamic generation.
    #[serde(default = "default_api_cache_endpoints")]
    pub api_cache_endpoints: Vec<String>,

    /// Page served when a document request fails with nothing cached.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Precache failure policy.
    #[serde(default)]
    pub install_mode: InstallMode,

    /// Sync tag that triggers contact form replay.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Drop a queued submission after this many failed replays.
    ///
    /// Unset means retry forever.
    #[serde(default)]
    pub sync_max_attempts: Option<u32>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Title used for push notifications.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Icon and badge path used for push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,
}

fn default_origin() -> String {
    "http://localhost:5000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_cache_prefix() -> String {
    "portfolio".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/static/assets/css/style.css",
        "/static/assets/css/animate.css",
        "/static/assets/css/responsive.css",
        "/static/assets/js/main.js",
        "/static/assets/logo/logo.png",
        "/static/assets/images/profile.jpg",
        "/static/manifest.json",
        "/offline.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_cache_endpoints() -> Vec<String> {
    vec!["/api/projects".into(), "/api/skills".into(), "/api/testimonials".into()]
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_sync_tag() -> String {
    "contact-form-sync".into()
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_app_name() -> String {
    "Portfolio".into()
}

fn default_notification_icon() -> String {
    "/static/assets/logo/logo.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            api_cache_endpoints: default_api_cache_endpoints(),
            offline_page: default_offline_page(),
            install_mode: InstallMode::default(),
            sync_tag: default_sync_tag(),
            sync_max_attempts: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            app_name: default_app_name(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the static generation, e.g. `portfolio-static-v1.0.0`.
    pub fn static_cache_name(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the dynamic generation, e.g. `portfolio-dynamic-v1.0.0`.
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
