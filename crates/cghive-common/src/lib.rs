//! # cghive-common
//!
//! Shared error taxonomy, domain types, configuration models, and constants
//! used across the cghive workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the foundational primitives that the cgroup
//! orchestration core builds upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod mask;
pub mod types;
