//! Database module for antakshari
//!
//! This module handles all database operations using SQLx with SQLite.

mod engine;
mod migrations;
mod seed;
pub mod tables;

pub use engine::DbEngine;
pub use migrations::run_migrations;
pub use seed::{ensure_admin_account, ensure_rotation_codes, seed_demo_catalog};
pub use tables::*;

#[cfg(test)]
pub use engine::test_engine;
