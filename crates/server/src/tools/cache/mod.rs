//! Cache storage tools.
//!
//! Read and prune the named cache generations directly, bypassing the
//! request strategies.

pub mod delete;
pub mod get;
pub mod keys;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
