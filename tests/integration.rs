//! Integration tests for frontend-intel
//!
//! - `scenarios`: end-to-end examples of analysis, optimization and refactoring
//! - `properties`: determinism, idempotence and validity properties
//! - `service`: orchestration cache, de-duplication and configuration

mod common;
mod properties;
mod scenarios;
mod service;
