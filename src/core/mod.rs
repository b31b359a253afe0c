//! Core round and catalog logic

pub mod catalog;
pub mod error;
pub mod lock;
pub mod media;
pub mod rotation;
pub mod selector;

pub use catalog::Catalog;
pub use error::ShuffleError;
pub use lock::LockController;
pub use media::{MediaAsset, MediaHost, Upload};
pub use rotation::RotationTable;
pub use selector::RoundSelector;
