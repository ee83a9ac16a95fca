//! cache_delete tool implementation.
//!
//! Drops a whole generation, or a single URL from one generation.

use offcache_client::CacheManager;
use offcache_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, json_result};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Generation name.
    pub cache: String,

    /// Delete only this URL. Deletes the whole generation when absent.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(manager: &CacheManager, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.cache.trim().is_empty() {
        return Err(ToolError::InvalidInput("cache cannot be empty".into()).into());
    }
    let db = manager.db();

    let deleted = match params.url {
        None => db.delete_cache(&params.cache).await?,
        Some(url) => {
            if !db.has_cache(&params.cache).await? {
                return Err(Error::CacheMiss(format!("no cache named {}", params.cache)).into());
            }
            let request = Request::get(manager.resolve(&url)?);
            db.open_cache(&params.cache).await?.delete(&request).await?
        }
    };

    if deleted {
        tracing::info!(cache = %params.cache, "deleted from storage");
    }
    json_result(&CacheDeleteOutput { deleted })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::testing::{StubNetwork, manager, output};
    use offcache_core::Response;

    async fn installed() -> CacheManager {
        let network = Arc::new(StubNetwork::default());
        network.serve("/", Response::new(200).with_body("home"));
        network.serve("/offline.html", Response::new(200).with_body("offline"));
        let mgr = manager(network).await;
        mgr.install().await.unwrap();
        mgr
    }

    #[tokio::test]
    async fn test_delete_single_url() {
        let mgr = installed().await;
        let params = CacheDeleteParams { cache: "site-static-v1.0.0".into(), url: Some("/".into()) };

        let out: CacheDeleteOutput = output(&delete_impl(&mgr, params).await.unwrap());
        assert!(out.deleted);

        let cache = mgr.db().open_cache("site-static-v1.0.0").await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let mgr = installed().await;
        let params = CacheDeleteParams { cache: "site-static-v1.0.0".into(), url: None };

        let out: CacheDeleteOutput = output(&delete_impl(&mgr, params.clone()).await.unwrap());
        assert!(out.deleted);
        assert!(mgr.db().cache_names().await.unwrap().is_empty());

        let out: CacheDeleteOutput = output(&delete_impl(&mgr, params).await.unwrap());
        assert!(!out.deleted);
    }

    #[tokio::test]
    async fn test_delete_empty_name() {
        let mgr = installed().await;
        let params = CacheDeleteParams { cache: "".into(), url: None };
        assert!(delete_impl(&mgr, params).await.is_err());
    }
}
