//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Request/response snapshots
//! - Cache storage with SQLite backend (generations, entries, sync queue)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{Cache, CacheDb, CachedRequest, PendingSync};
pub use config::{AppConfig, ConfigError, InstallMode};
pub use error::Error;
pub use http::{Destination, Request, Response};
