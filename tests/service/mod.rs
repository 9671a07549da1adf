//! Orchestration service tests
//!
//! - Cache hits, invalidation and eviction through the public API
//! - In-flight de-duplication under concurrent requests
//! - Operation routing and error wrapping
//! - Loading configuration from disk

pub mod config_tests;
pub mod service_tests;
