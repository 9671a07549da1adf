//! Properties that hold for any input
//!
//! - Parsing and analysis are deterministic
//! - Organize-imports reaches a fixed point after one run
//! - Every accepted plan re-parses
//! - Adding a branch never lowers complexity
//! - Suggestions are unique per (kind, target)
//! - Dry runs and rejected plans leave the source untouched

pub mod property_tests;
