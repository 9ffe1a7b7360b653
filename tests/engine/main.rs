//! Engine integration tests
//!
//! Run with: cargo test --test engine

#[path = "../common/mod.rs"]
mod common;

mod collection;
mod registry;
