//! Reelshelf - video library catalog
//!
//! This library crate exposes the reconciliation engine and HTTP surface for
//! the binary and for integration testing.

pub mod config;
pub mod download;
pub mod library;
pub mod metadata;
pub mod probe;
pub mod server;
pub mod store;
pub mod sync;
