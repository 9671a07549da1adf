//! End-to-end scenarios
//!
//! - Complexity of a single branching function
//! - Memoization suggestion for an unwrapped list-rendering component
//! - Inline of a reassigned variable after extract-variable
//! - Refactorings exercised on realistic files

pub mod scenario_tests;
