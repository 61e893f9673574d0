//! Reelshelf-DB: Database schema, migrations, and query operations
//!
//! This crate provides the video record store for reelshelf using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use reelshelf_db::pool::{init_pool, get_conn};
//! use reelshelf_db::queries::videos;
//!
//! let pool = init_pool("/var/lib/reelshelf/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! for video in videos::list_videos(&conn).unwrap() {
//!     println!("{} (available: {})", video.filename, video.is_available);
//! }
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
