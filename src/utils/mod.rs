//! Utility modules

pub mod auth;
