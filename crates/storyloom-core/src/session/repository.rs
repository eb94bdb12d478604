//! Session repository trait.
//!
//! Defines the interface for session record persistence.

use super::model::SessionRecord;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract document store for session records.
///
/// Writes are whole-document, last-write-wins. Callers only ever hand in
/// normalized records.
///
/// # Implementation Notes
///
/// `list_by_user` is a broad fetch. Filtering by title and state, and
/// ordering by recency, happen in memory on the caller side.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a record by its session ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SessionRecord))`: Record found
    /// - `Ok(None)`: Record not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Creates or replaces a record.
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Deletes a record. Deleting a missing record is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists every record owned by `user_id`, in no particular order.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>>;
}
