//! Shared helpers for integration tests.

// Each test binary compiles this module; not every binary uses every helper.
#![allow(dead_code)]

pub mod asserts;
pub mod fixtures;
pub mod nodes;
