//! lea-test - Assertion test synthesis
//!
//! Expands the inline assertion annotations of a script into synthetic test
//! scripts. Each test selects the rows violating its assertion from the
//! parent's audit table, so tests run during the write phase, before
//! anything is promoted.

pub mod generator;

pub use generator::assertion_scripts;
