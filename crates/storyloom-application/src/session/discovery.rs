//! Discovery of a resumable session for a story.

use storyloom_core::session::SessionRecord;

/// What `check_existing` found for the current user and story.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistingSession {
    /// Nothing stored for this story
    None,
    /// A record exists but holds only the opening turn and no choices
    NoProgress(SessionRecord),
    /// A record with real progress the player may resume or reset
    Resumable(SessionRecord),
}

impl ExistingSession {
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Resumable(_))
    }
}

/// Picks the most recently updated unfinished record for `story_title`.
pub fn select_resumable(records: Vec<SessionRecord>, story_title: &str) -> Option<SessionRecord> {
    records
        .into_iter()
        .filter(|r| r.story_title == story_title && !r.completed && !r.turns.is_empty())
        .max_by_key(|r| r.last_updated)
}

/// Classifies the selected candidate.
pub fn classify(candidate: Option<SessionRecord>) -> ExistingSession {
    match candidate {
        None => ExistingSession::None,
        Some(record) if record.has_progress() => ExistingSession::Resumable(record),
        Some(record) => ExistingSession::NoProgress(record),
    }
}

/// Ids of every unfinished record for `story_title`, as removed by a reset.
pub fn resettable_ids(records: &[SessionRecord], story_title: &str) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.story_title == story_title && !r.completed)
        .map(|r| r.session_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use storyloom_core::story::TurnRole;

    fn record(id: &str, title: &str, turns: usize, minutes_ago: i64) -> SessionRecord {
        let mut record = SessionRecord::new(id, "u-1", title, "");
        for i in 0..turns {
            record.push_turn(TurnRole::Narrator, format!("part {i}"));
        }
        record.last_updated = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[test]
    fn test_picks_most_recent_unfinished_record() {
        let mut done = record("done", "Quest", 5, 0);
        done.completed = true;
        let records = vec![
            record("old", "Quest", 2, 30),
            record("fresh", "Quest", 3, 5),
            record("empty", "Quest", 0, 1),
            record("other", "Another", 4, 2),
            done,
        ];

        let picked = select_resumable(records, "Quest").unwrap();
        assert_eq!(picked.session_id, "fresh");
        assert_eq!(picked.turns.len(), 3);
        assert!(classify(Some(picked)).is_resumable());
    }

    #[test]
    fn test_opening_only_has_no_progress() {
        let opening = record("s", "Quest", 1, 0);
        assert!(matches!(
            classify(Some(opening.clone())),
            ExistingSession::NoProgress(_)
        ));

        let mut with_choices = opening;
        with_choices.pending_choices = vec!["Go".to_string()];
        assert!(classify(Some(with_choices)).is_resumable());
        assert_eq!(classify(None), ExistingSession::None);
    }

    #[test]
    fn test_resettable_ids_skip_completed_and_other_titles() {
        let mut done = record("done", "Quest", 5, 0);
        done.completed = true;
        let records = vec![
            record("a", "Quest", 1, 0),
            record("b", "Quest", 3, 0),
            record("c", "Another", 3, 0),
            done,
        ];
        assert_eq!(resettable_ids(&records, "Quest"), vec!["a", "b"]);
    }
}
