//! Storage and configuration adapters for Storyloom.
//!
//! - [`JsonDirSessionRepository`]: one JSON file per session record
//! - [`InMemorySessionRepository`]: process-local store for tests and demos
//! - [`ConfigService`]: cached `config.toml` loading

pub mod config_service;
pub mod in_memory_session_repository;
pub mod json_dir_session_repository;
pub mod paths;

pub use config_service::ConfigService;
pub use in_memory_session_repository::InMemorySessionRepository;
pub use json_dir_session_repository::JsonDirSessionRepository;
pub use paths::{PathError, StoryloomPaths};
