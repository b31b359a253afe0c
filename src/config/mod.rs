//! Configuration module for antakshari
//!
//! This module contains the server configuration structures and path management.

mod paths;
mod server_config;

pub use paths::Paths;
pub use server_config::{MediaConfig, MediaProvider, ServerConfig};
