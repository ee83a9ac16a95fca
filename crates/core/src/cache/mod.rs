//! SQLite-backed cache storage for intercepted requests.
//!
//! This module provides the durable store behind the cache manager, using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named cache generations holding request/response entries
//! - Request keys derived from method and canonical URL (SHA-256)
//! - A queue of requests waiting for a background sync replay
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;
pub mod sync_queue;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{Cache, CachedRequest};
pub use sync_queue::PendingSync;
