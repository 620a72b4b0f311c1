//! # ciconv-common
//!
//! Shared types, error definitions, target configuration and constants
//! used across the ciconv workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the value types that the conversion engine
//! produces and the CLI serializes.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
