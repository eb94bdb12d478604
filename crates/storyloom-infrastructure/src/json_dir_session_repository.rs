//! Directory-backed SessionRepository storing one JSON document per record.

use crate::paths::StoryloomPaths;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storyloom_core::error::{Result, StoryError};
use storyloom_core::session::{SessionRecord, SessionRepository};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Session repository backed by a directory of JSON files.
///
/// Directory structure:
/// ```text
/// sessions_dir/
/// ├── <session-id-1>.json
/// └── <session-id-2>.json
/// ```
///
/// - **Atomic writes**: tmp file + fsync + rename, so readers never see a
///   half-written record
/// - **Tolerant listing**: unreadable or malformed files are skipped with a
///   warning; loading one directly reports a validation error
pub struct JsonDirSessionRepository {
    sessions_dir: PathBuf,
}

impl JsonDirSessionRepository {
    /// Creates a repository at the default location (~/.config/storyloom/sessions).
    pub async fn default_location() -> anyhow::Result<Self> {
        let sessions_dir = StoryloomPaths::sessions_dir()
            .map_err(|e| anyhow!("Failed to get sessions directory: {}", e))?;
        Self::new(sessions_dir).await
    }

    /// Creates a repository rooted at `sessions_dir`, creating it if needed.
    pub async fn new(sessions_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir)
            .await
            .with_context(|| format!("Failed to create {}", sessions_dir.display()))?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn record_path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id != "."
            && session_id != ".."
            && !session_id.contains(['/', '\\']);
        if !valid {
            return Err(StoryError::validation(format!(
                "invalid session id '{session_id}'"
            )));
        }
        Ok(self.sessions_dir.join(format!("{session_id}.json")))
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");

        let mut tmp_file = fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("Failed to create temp file '{}'", tmp_path.display()))?;
        tmp_file
            .write_all(contents)
            .await
            .with_context(|| format!("Failed to write temp file '{}'", tmp_path.display()))?;
        tmp_file
            .sync_all()
            .await
            .with_context(|| format!("Failed to sync temp file '{}'", tmp_path.display()))?;
        drop(tmp_file);

        fs::rename(&tmp_path, path).await.with_context(|| {
            format!(
                "Failed to rename '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }

    async fn load_all(&self) -> anyhow::Result<Vec<SessionRecord>> {
        let mut entries = fs::read_dir(&self.sessions_dir)
            .await
            .with_context(|| format!("Failed to read {}", self.sessions_dir.display()))?;

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .await
                .map_err(anyhow::Error::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<SessionRecord>(&bytes)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping malformed session file"
                    );
                }
            }
        }
        Ok(records)
    }
}

fn persistence(err: anyhow::Error) -> StoryError {
    StoryError::persistence(format!("{err:#}"))
}

#[async_trait]
impl SessionRepository for JsonDirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(session_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(persistence(
                    anyhow::Error::from(e).context(format!("Failed to read {}", path.display())),
                ));
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StoryError::validation(format!("malformed session file {}: {e}", path.display()))
        })
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.record_path(&record.session_id)?;
        let contents = serde_json::to_vec_pretty(record)?;
        Self::write_atomic(&path, &contents)
            .await
            .map_err(persistence)?;
        tracing::debug!(session_id = %record.session_id, "Session file written");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.record_path(session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence(
                anyhow::Error::from(e).context(format!("Failed to delete {}", path.display())),
            )),
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let records = self.load_all().await.map_err(persistence)?;
        Ok(records
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::story::TurnRole;
    use tempfile::TempDir;

    fn record(id: &str, user_id: &str) -> SessionRecord {
        let mut record = SessionRecord::new(id, user_id, "Quest", "A quest");
        record.push_turn(TurnRole::Narrator, "Opening");
        record.pending_choices = vec!["Go".to_string()];
        record
    }

    #[tokio::test]
    async fn test_save_and_find_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonDirSessionRepository::new(temp_dir.path()).await.unwrap();

        let original = record("s-1", "u-1");
        repository.save(&original).await.unwrap();

        let loaded = repository.find_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(temp_dir.path().join("s-1.json").exists());
        assert!(!temp_dir.path().join("s-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_record_is_none_and_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonDirSessionRepository::new(temp_dir.path()).await.unwrap();

        assert!(repository.find_by_id("nope").await.unwrap().is_none());
        repository.save(&record("s-1", "u-1")).await.unwrap();
        repository.delete("s-1").await.unwrap();
        repository.delete("s-1").await.unwrap();
        assert!(repository.find_by_id("s-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_user_and_skips_malformed_files() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonDirSessionRepository::new(temp_dir.path()).await.unwrap();

        repository.save(&record("a", "u-1")).await.unwrap();
        repository.save(&record("b", "u-1")).await.unwrap();
        repository.save(&record("c", "u-2")).await.unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), b"{ not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut ids: Vec<_> = repository
            .list_by_user("u-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        let err = repository.find_by_id("broken").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_rejects_ids_that_escape_the_directory() {
        let temp_dir = TempDir::new().unwrap();
        let repository = JsonDirSessionRepository::new(temp_dir.path()).await.unwrap();

        assert!(repository.find_by_id("../etc").await.unwrap_err().is_validation());
        assert!(repository.delete("").await.unwrap_err().is_validation());
        let mut bad = record("x", "u-1");
        bad.session_id = "a/b".to_string();
        assert!(repository.save(&bad).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_creates_nested_sessions_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("deep").join("sessions");
        let repository = JsonDirSessionRepository::new(&nested).await.unwrap();
        assert_eq!(repository.sessions_dir(), nested.as_path());
        assert!(nested.is_dir());
    }
}
