//! Session application services.
//!
//! This module contains the session continuation use case: discovering a
//! resumable session, running turns against the story engine and saving
//! progress in the background.

mod autosave;
mod discovery;
mod manager;


pub use autosave::Autosaver;
pub use discovery::{ExistingSession, classify, resettable_ids, select_resumable};
pub use manager::{
    ActivityHandle, CompletionChoice, ContinuationDecision, FORCED_CONCLUSION_SUFFIX,
    SessionContinuationManager, SessionState, TurnOutcome,
};
