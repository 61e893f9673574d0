//! Reelshelf-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across reelshelf:
//!
//! - **Error Handling**: Common error types and result aliases
//! - **Path Utilities**: Extension filtering for the watched video directory
//!
//! # Examples
//!
//! ```
//! use reelshelf_common::paths::{has_allowed_extension, default_video_extensions};
//! use reelshelf_common::{Error, Result};
//! use std::path::Path;
//!
//! let allowed = default_video_extensions();
//! assert!(has_allowed_extension(Path::new("movie.mkv"), &allowed));
//!
//! fn example() -> Result<()> {
//!     Err(Error::database("database is locked"))
//! }
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
