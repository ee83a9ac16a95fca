//! Request classification.
//!
//! Decision order, first match wins:
//! 1. non-GET to an admin or API path: bypass
//! 2. `document` destination: page
//! 3. `image` destination: image
//! 4. API path
//! 5. admin path
//! 6. static asset (destination or path shape)
//! 7. anything else: uncategorized

use offcache_core::{Destination, Request};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which strategy a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Straight to the network, result propagated unchanged.
    Bypass,
    /// Network-first, offline document fallback.
    Page,
    /// Cache-first, stored in the dynamic generation.
    Image,
    /// Network-first, JSON error fallback.
    Api,
    /// Network-only.
    Admin,
    /// Cache-first, stored in the static generation.
    StaticAsset,
    /// Stale-while-revalidate.
    Uncategorized,
}

/// Path markers driving classification.
#[derive(Debug, Clone)]
pub struct RouteRules {
    pub api_marker: String,
    pub admin_marker: String,
    pub contact_marker: String,
    pub static_markers: Vec<String>,
    pub static_extensions: Vec<String>,
    /// API path prefixes whose responses may be cached.
    pub api_cache_endpoints: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            api_marker: "/api/".into(),
            admin_marker: "/admin/".into(),
            contact_marker: "/contact".into(),
            static_markers: vec!["/static/".into(), "/assets/".into()],
            static_extensions: [".css", ".js", ".png", ".jpg", ".jpeg", ".webp", ".svg", ".woff", ".woff2", ".ico"]
                .into_iter()
                .map(String::from)
                .collect(),
            api_cache_endpoints: vec!["/api/projects".into(), "/api/skills".into(), "/api/testimonials".into()],
        }
    }
}

impl RouteRules {
    pub fn classify(&self, request: &Request) -> Route {
        let path = request.path();
        let is_api = path.contains(&self.api_marker);
        let is_admin = path.contains(&self.admin_marker);

        if !request.is_get() && (is_api || is_admin) {
            return Route::Bypass;
        }

        match request.destination {
            Destination::Document => return Route::Page,
            Destination::Image => return Route::Image,
            _ => {}
        }

        if is_api {
            Route::Api
        } else if is_admin {
            Route::Admin
        } else if self.is_static(request.destination, &path) {
            Route::StaticAsset
        } else {
            Route::Uncategorized
        }
    }

    fn is_static(&self, destination: Destination, path: &str) -> bool {
        if matches!(
            destination,
            Destination::Style | Destination::Script | Destination::Font | Destination::Manifest
        ) {
            return true;
        }
        let lower = path.to_ascii_lowercase();
        self.static_markers.iter().any(|m| lower.contains(m.as_str()))
            || self.static_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// Whether an API response for this path may be stored.
    pub fn is_api_cacheable(&self, path: &str) -> bool {
        self.api_cache_endpoints.iter().any(|endpoint| path.starts_with(endpoint.as_str()))
    }

    /// Whether a failed submission to this request's path should be queued
    /// for background sync.
    pub fn is_sync_eligible(&self, request: &Request) -> bool {
        !request.is_get() && request.path().contains(&self.contact_marker)
    }
}
