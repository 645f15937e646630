//! Database Backend Abstractions
//!
//! This module provides the dialect, value and executor abstractions the
//! migration engine runs on, plus a sqlx-backed implementation covering
//! PostgreSQL, MySQL and SQLite.

pub mod any;
pub mod core;

// Re-export core traits and types
pub use any::{AnyBackend, AnyConnectionExecutor};
pub use self::core::*;
