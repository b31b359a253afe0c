//! Data models for antakshari
//!
//! This module contains the core data structures used throughout the application.

mod enums;
mod song;
mod user;

pub use enums::Language;
pub use song::{short_code, NewSong, Song};
pub use user::{Requester, Role, User};
