pub mod config;
pub mod engine;
pub mod error;
pub mod recovery;
pub mod scene;
pub mod session;
pub mod story;

// Re-export common error type
pub use error::{Result, StoryError};
