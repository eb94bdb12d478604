//! In-memory SessionRepository implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use storyloom_core::error::Result;
use storyloom_core::session::{SessionRecord, SessionRepository};
use tokio::sync::RwLock;

/// Session repository kept entirely in memory.
///
/// Useful for embedding without a filesystem and for tests. Records are
/// lost when the repository is dropped.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.read().await.get(session_id).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.records.write().await.remove(session_id);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_find_list_delete() {
        let repository = InMemorySessionRepository::new();
        repository
            .save(&SessionRecord::new("s-1", "u-1", "Quest", ""))
            .await
            .unwrap();
        repository
            .save(&SessionRecord::new("s-2", "u-2", "Quest", ""))
            .await
            .unwrap();

        assert!(repository.find_by_id("s-1").await.unwrap().is_some());
        assert!(repository.find_by_id("missing").await.unwrap().is_none());

        let listed = repository.list_by_user("u-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session_id, "s-1");

        repository.delete("s-1").await.unwrap();
        repository.delete("s-1").await.unwrap();
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_record() {
        let repository = InMemorySessionRepository::new();
        let mut record = SessionRecord::new("s-1", "u-1", "Quest", "");
        repository.save(&record).await.unwrap();

        record.completed = true;
        repository.save(&record).await.unwrap();

        assert_eq!(repository.len().await, 1);
        assert!(repository.find_by_id("s-1").await.unwrap().unwrap().completed);
    }
}
