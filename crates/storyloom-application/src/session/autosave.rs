//! Debounced, serialized autosave.
//!
//! Every session owns one [`Autosaver`]. Snapshots handed to
//! [`schedule`](Autosaver::schedule) are coalesced: the worker waits until
//! no new snapshot has arrived for the debounce delay, then writes the
//! latest one. All writes run on the worker task, so they never overlap.

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storyloom_core::error::{Result, StoryError};
use storyloom_core::session::{SessionRecord, SessionRepository, normalize_record};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

enum Command {
    Schedule(SessionRecord),
    Flush(oneshot::Sender<Result<()>>),
    Discard(oneshot::Sender<()>),
}

/// Handle to a session's autosave worker.
///
/// Must be created inside a tokio runtime.
pub struct Autosaver {
    commands: mpsc::UnboundedSender<Command>,
    // Schedules sent but not yet written or discarded
    outstanding: Arc<AtomicUsize>,
}

impl Autosaver {
    pub fn spawn(repository: Arc<dyn SessionRepository>, delay: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(
            repository,
            delay,
            receiver,
            Arc::clone(&outstanding),
        ));

        Self {
            commands,
            outstanding,
        }
    }

    /// Queues `record` for a debounced write, replacing any pending snapshot.
    pub fn schedule(&self, record: SessionRecord) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.commands.send(Command::Schedule(record)).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("[Autosaver] Worker stopped, snapshot dropped");
        }
    }

    /// Writes the pending snapshot now, if there is one.
    ///
    /// Returns the result of that write so the caller can surface it.
    pub async fn flush(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| StoryError::internal("autosave worker stopped"))?;
        response
            .await
            .map_err(|_| StoryError::internal("autosave worker stopped"))?
    }

    /// Drops the pending snapshot and waits for any write in flight.
    pub async fn discard(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Discard(reply)).is_ok() {
            let _ = response.await;
        }
    }

    /// Whether a snapshot is waiting for, or undergoing, its write.
    pub fn is_busy(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }
}

async fn run_worker(
    repository: Arc<dyn SessionRepository>,
    delay: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    outstanding: Arc<AtomicUsize>,
) {
    let mut pending: Option<SessionRecord> = None;
    let mut coalesced = 0usize;
    let mut deadline: Option<Instant> = None;
    let settle = |coalesced: &mut usize| {
        outstanding.fetch_sub(std::mem::take(coalesced), Ordering::SeqCst);
    };

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = commands.recv() => command,
                _ = sleep_until(at) => {
                    deadline = None;
                    if let Some(record) = pending.take() {
                        if let Err(e) = write(repository.as_ref(), &record).await {
                            tracing::warn!(
                                session_id = %record.session_id,
                                error = %e,
                                "[Autosaver] Autosave failed"
                            );
                        }
                    }
                    settle(&mut coalesced);
                    continue;
                }
            },
            None => commands.recv().await,
        };

        match command {
            Some(Command::Schedule(record)) => {
                pending = Some(record);
                coalesced += 1;
                deadline = Some(Instant::now() + delay);
            }
            Some(Command::Flush(reply)) => {
                deadline = None;
                let result = match pending.take() {
                    Some(record) => write(repository.as_ref(), &record).await,
                    None => Ok(()),
                };
                settle(&mut coalesced);
                let _ = reply.send(result);
            }
            Some(Command::Discard(reply)) => {
                deadline = None;
                if let Some(record) = pending.take() {
                    tracing::debug!(
                        session_id = %record.session_id,
                        "[Autosaver] Pending snapshot discarded"
                    );
                }
                settle(&mut coalesced);
                let _ = reply.send(());
            }
            None => {
                if let Some(record) = pending.take() {
                    if let Err(e) = write(repository.as_ref(), &record).await {
                        tracing::warn!(
                            session_id = %record.session_id,
                            error = %e,
                            "[Autosaver] Final autosave failed"
                        );
                    }
                }
                break;
            }
        }
    }
}

async fn write(repository: &dyn SessionRepository, record: &SessionRecord) -> Result<()> {
    let normalized = normalize_record(record, Utc::now());
    repository.save(&normalized).await?;
    tracing::debug!(
        session_id = %normalized.session_id,
        turns = normalized.turns.len(),
        "[Autosaver] Session saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storyloom_core::story::TurnRole;
    use tokio::sync::Mutex;

    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    struct RecordingRepository {
        writes: Mutex<Vec<SessionRecord>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SessionRepository for RecordingRepository {
        async fn find_by_id(&self, _session_id: &str) -> Result<Option<SessionRecord>> {
            Ok(None)
        }

        async fn save(&self, record: &SessionRecord) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoryError::persistence("disk full"));
            }
            self.writes.lock().await.push(record.clone());
            Ok(())
        }

        async fn delete(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }

        async fn list_by_user(&self, _user_id: &str) -> Result<Vec<SessionRecord>> {
            Ok(Vec::new())
        }
    }

    fn snapshot(turns: usize) -> SessionRecord {
        let mut record = SessionRecord::new("s-1", "u-1", "Quest", "");
        for i in 0..turns {
            record.push_turn(TurnRole::Narrator, format!("part {i}"));
        }
        record
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_coalesce_into_one_write() {
        let repository = Arc::new(RecordingRepository::default());
        let autosaver = Autosaver::spawn(repository.clone(), Duration::from_secs(2));

        for turns in 1..=5 {
            autosaver.schedule(snapshot(turns));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(autosaver.is_busy());
        tokio::time::sleep(Duration::from_secs(3)).await;

        let writes = repository.writes.lock().await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].turns.len(), 5);
        assert_eq!(writes[0].progress.total_parts, 5);
        assert!(!autosaver.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_write_separately() {
        let repository = Arc::new(RecordingRepository::default());
        let autosaver = Autosaver::spawn(repository.clone(), Duration::from_secs(2));

        autosaver.schedule(snapshot(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        autosaver.schedule(snapshot(2));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(repository.writes.lock().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately() {
        let repository = Arc::new(RecordingRepository::default());
        let autosaver = Autosaver::spawn(repository.clone(), Duration::from_secs(2));

        autosaver.schedule(snapshot(2));
        autosaver.flush().await.unwrap();
        assert_eq!(repository.writes.lock().await.len(), 1);

        // Nothing pending: flushing again is a no-op.
        autosaver.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(repository.writes.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_surfaces_failure_but_debounced_write_does_not() {
        let repository = Arc::new(RecordingRepository::default());
        repository.fail.store(true, Ordering::SeqCst);
        let autosaver = Autosaver::spawn(repository.clone(), Duration::from_secs(2));

        autosaver.schedule(snapshot(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!autosaver.is_busy());

        autosaver.schedule(snapshot(2));
        let err = autosaver.flush().await.unwrap_err();
        assert!(err.is_persistence());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_drops_pending_snapshot() {
        let repository = Arc::new(RecordingRepository::default());
        let autosaver = Autosaver::spawn(repository.clone(), Duration::from_secs(2));

        autosaver.schedule(snapshot(1));
        autosaver.discard().await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(repository.writes.lock().await.is_empty());
        assert!(!autosaver.is_busy());
    }
}
