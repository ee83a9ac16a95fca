//! cache_keys tool implementation.

use offcache_client::CacheManager;
use offcache_core::{CachedRequest, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list. When absent, lists the generation names.
    #[serde(default)]
    pub cache: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheKeysOutput {
    Caches { caches: Vec<String> },
    Entries { cache: String, entries: Vec<CachedRequest> },
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(manager: &CacheManager, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let db = manager.db();
    let output = match params.cache {
        None => CacheKeysOutput::Caches { caches: db.cache_names().await? },
        Some(name) => {
            if !db.has_cache(&name).await? {
                return Err(Error::CacheMiss(format!("no cache named {name}")).into());
            }
            let entries = db.open_cache(&name).await?.keys().await?;
            CacheKeysOutput::Entries { cache: name, entries }
        }
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::testing::{StubNetwork, manager, output};
    use offcache_core::Response;

    #[tokio::test]
    async fn test_keys_lists_generations() {
        let network = Arc::new(StubNetwork::default());
        network.serve("/", Response::new(200).with_body("home"));
        let mgr = manager(network).await;
        mgr.install().await.unwrap();

        let out: CacheKeysOutput = output(&keys_impl(&mgr, CacheKeysParams { cache: None }).await.unwrap());
        match out {
            CacheKeysOutput::Caches { caches } => assert_eq!(caches, vec!["site-static-v1.0.0".to_string()]),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keys_lists_entries() {
        let network = Arc::new(StubNetwork::default());
        network.serve("/", Response::new(200).with_body("home"));
        let mgr = manager(network).await;
        mgr.install().await.unwrap();

        let params = CacheKeysParams { cache: Some("site-static-v1.0.0".into()) };
        let out: CacheKeysOutput = output(&keys_impl(&mgr, params).await.unwrap());
        match out {
            CacheKeysOutput::Entries { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].url, "https://example.com/");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keys_unknown_cache() {
        let mgr = manager(Arc::new(StubNetwork::default())).await;
        let result = keys_impl(&mgr, CacheKeysParams { cache: Some("missing".into()) }).await;
        assert!(result.is_err());
    }
}
