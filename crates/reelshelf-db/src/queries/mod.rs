//! Database query operations.
//!
//! Each submodule covers one table.

pub mod videos;
