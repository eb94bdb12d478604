//! Application layer for Storyloom.
//!
//! This crate provides the use cases that coordinate the story engine and the
//! session store on behalf of a player.

pub mod session;

pub use session::{SessionContinuationManager, SessionState};
