//! Client side of offcache.
//!
//! This crate provides the network seam and the offline cache manager that
//! classifies intercepted requests and applies the caching strategies.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};

pub use worker::{
    ActivationReport, CacheManager, InstallReport, Notification, Route, RouteRules, Served, Source, SyncReport,
    WorkerConfig, WorkerState, WorkerStatus,
};
