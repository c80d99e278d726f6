//! Progress persistence for lessontrack.
//!
//! This crate provides the trait-based storage interface the watch-progress
//! tracker and the completion validator talk to, with a JSON file backend
//! and an in-memory backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{ProgressStore, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
