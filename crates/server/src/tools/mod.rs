//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offcache server.

pub mod cache;
pub mod sw_events;
pub mod sw_fetch;

#[cfg(test)]
pub(crate) mod testing;

pub use sw_events::{SwMessageParams, SwNotificationClickParams, SwPushParams, SwStatusParams, SwSyncParams};
pub use sw_fetch::{SwFetchOutput, SwFetchParams};
