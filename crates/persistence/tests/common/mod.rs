//! Test infrastructure for the persistence layer.
//!
//! Fixtures for building instances and archives, and an adapter wrapper that
//! records which commands an operation asked for.

#![allow(dead_code)]

pub mod fixtures;
pub mod recording;

pub use fixtures::*;
pub use recording::*;
